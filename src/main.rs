fn main() -> std::process::ExitCode {
    app_remover_lib::run()
}
