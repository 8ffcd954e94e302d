use crate::cli::actions::Action;
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .map(String::to_string)
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{name}"))
    };

    Ok(Action::Demo {
        provider: required("provider")?,
        client_id: required("client-id")?,
        redirect_url: required("redirect-url")?,
        flow: required("flow")?,
        scheme: required("scheme")?,
        subject: required("subject")?,
        epoch_url: matches.get_one::<String>("epoch-url").cloned(),
        epoch_window: matches.get_one::<u64>("epoch-window").copied().unwrap_or(10),
        fallback_epoch: matches
            .get_one::<u64>("fallback-epoch")
            .copied()
            .unwrap_or(100),
        fixed_salt: matches.get_one::<String>("fixed-salt").cloned(),
    })
}
