use std::process::ExitCode;

fn main() -> ExitCode {
    cert_renewer::run()
}
