//! Mint a master rune from a secret, restrict it, serialize it, and check it
//! against a runtime context — the full lifecycle in one place.

use std::collections::HashMap;

use clap::Parser;
use runes::alternative::{Alternative, Operator};
use runes::restriction::Restriction;
use runes::value::{FieldValue, Value};
use runes::MasterRune;

/// Exercise the basic rune lifecycle against a secret read from
/// `RUNE_SECRET`.
#[derive(Parser)]
struct Args {
    /// Method name the demo rune will be restricted to.
    #[arg(long, default_value = "listpeers")]
    method: String,

    /// Method name used to check the rune (mismatch demonstrates rejection).
    #[arg(long, default_value = "listpeers")]
    check_method: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let secret = std::env::var("RUNE_SECRET").unwrap_or_else(|_| "development-only-secret".to_string());
    if secret == "development-only-secret" {
        log::warn!("RUNE_SECRET not set, using an insecure development default");
    }

    let master = MasterRune::new(secret.into_bytes(), Vec::new()).expect("valid secret");

    let alt = Alternative::new("method", Operator::Equal, Value::String(args.method.clone()), false)
        .expect("valid alternative");
    let restriction = Restriction::new(vec![alt]).expect("non-empty restriction");
    let restricted = master.restrict([restriction]).expect("valid restriction");

    println!("rune text:   {}", restricted.to_text());
    println!("rune base64: {}", restricted.to_base64());

    let mut vals: HashMap<String, FieldValue> = HashMap::new();
    vals.insert(
        "method".to_string(),
        FieldValue::Value(Value::String(args.check_method.clone())),
    );

    match master.check(&restricted, &vals) {
        Ok(()) => println!("check ok: method={} is authorized", args.check_method),
        Err(e) => println!("check failed: {e}"),
    }
}
