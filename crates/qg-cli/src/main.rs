use qg_cli::{run, EXIT_ERROR};

fn main() {
    let code = match run(std::env::args_os()) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    };
    std::process::exit(code);
}
