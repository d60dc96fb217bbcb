use hytale_assist::cli;

fn main() -> anyhow::Result<()> {
    cli::init_tracing();
    let command_line_interface = cli::CommandLineInterface::load();
    command_line_interface.run()
}
