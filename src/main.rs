mod app;
mod cli;

fn main() {
    let cli = cli::parse();
    app::init_logging();
    app::run(cli);
}
