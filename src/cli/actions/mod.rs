pub mod demo;

/// What the CLI was asked to do.
#[derive(Debug)]
pub enum Action {
    Demo {
        provider: String,
        client_id: String,
        redirect_url: String,
        flow: String,
        scheme: String,
        subject: String,
        epoch_url: Option<String>,
        epoch_window: u64,
        fallback_epoch: u64,
        fixed_salt: Option<String>,
    },
}
