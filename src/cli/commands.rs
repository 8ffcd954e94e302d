use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("zklogin")
        .about("zkLogin session orchestration")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("provider")
                .long("provider")
                .help("Identity provider name")
                .default_value("google")
                .env("ZKLOGIN_PROVIDER"),
        )
        .arg(
            Arg::new("client-id")
                .long("client-id")
                .help("OAuth client id")
                .env("ZKLOGIN_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new("redirect-url")
                .long("redirect-url")
                .help("OAuth redirect URL")
                .env("ZKLOGIN_REDIRECT_URL")
                .required(true),
        )
        .arg(
            Arg::new("flow")
                .long("flow")
                .help("OAuth flow: implicit or code")
                .default_value("implicit")
                .env("ZKLOGIN_FLOW")
                .value_parser(["implicit", "code"]),
        )
        .arg(
            Arg::new("scheme")
                .long("scheme")
                .help("Ephemeral key scheme: EdDSA-25519 or ECDSA-secp256k1")
                .default_value("EdDSA-25519")
                .env("ZKLOGIN_SCHEME"),
        )
        .arg(
            Arg::new("subject")
                .long("subject")
                .help("Subject claim used by the demo token")
                .default_value("demo-user")
                .env("ZKLOGIN_SUBJECT"),
        )
        .arg(
            Arg::new("epoch-url")
                .long("epoch-url")
                .help("Endpoint returning {\"epoch\": <number>}; omit to use the fallback epoch")
                .env("ZKLOGIN_EPOCH_URL"),
        )
        .arg(
            Arg::new("epoch-window")
                .long("epoch-window")
                .help("Epochs the session signature stays valid for")
                .default_value("10")
                .env("ZKLOGIN_EPOCH_WINDOW")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("fallback-epoch")
                .long("fallback-epoch")
                .help("Epoch substituted when the epoch fetch fails")
                .default_value("100")
                .env("ZKLOGIN_FALLBACK_EPOCH")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("fixed-salt")
                .long("fixed-salt")
                .help("Use a constant salt instead of the per-identity store")
                .env("ZKLOGIN_FIXED_SALT"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("ZKLOGIN_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
