fn main() {
    if let Err(err) = siteaudit::cli::run() {
        siteaudit::ui::eprintln_error(&err);
        std::process::exit(siteaudit::exit::exit_code(&err));
    }
}
