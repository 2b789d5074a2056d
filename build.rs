use std::env;

const DEFAULT_SYSTEM_PREAMBLE: &str =
    "You are Antigravity, an AI coding assistant. Follow the user's instructions carefully.";

fn main() {
    dotenvy::dotenv().ok();
    println!("cargo:rerun-if-changed=.env");
    println!("cargo:rerun-if-env-changed=GATEWAY_SYSTEM_PREAMBLE");

    let preamble = env::var("GATEWAY_SYSTEM_PREAMBLE").unwrap_or_else(|_| DEFAULT_SYSTEM_PREAMBLE.to_string());
    println!("cargo:rustc-env=GATEWAY_SYSTEM_PREAMBLE={preamble}");
}
