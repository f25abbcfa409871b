fn main() -> std::process::ExitCode {
    stepcraft_lib::run()
}
