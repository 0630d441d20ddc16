use clap::{Arg, Command, ValueHint};
use hitlist_cli::input::Input;
use hitlist_cli::runner::Runner;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::default()
        .filter_level(log::LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("HITLIST_LOG", "error,hitlist=info"))
        .init();

    let matches = Command::new("hitlist")
        .version(clap::crate_version!())
        .author("Michael Lazear <michaellazear92@gmail.com>")
        .about("Synopsis and first-hits tables from MS-GF+ and TopPIC results")
        .arg(
            Arg::new("parameters")
                .required(true)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help("Path to configuration parameters (JSON file)")
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("input_paths")
                .num_args(1..)
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Paths to MS-GF+ or TopPIC result files to process. Overrides files listed \
                     in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("fasta")
                .short('f')
                .long("fasta")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path to FASTA database, used to choose between proteins of equal score. \
                     Overrides the FASTA file specified in the configuration file.",
                )
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("output_directory")
                .short('o')
                .long("output_directory")
                .value_parser(clap::builder::NonEmptyStringValueParser::new())
                .help(
                    "Path where results will be written. \
                     Overrides the directory specified in the configuration file.",
                )
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("tool")
                .short('t')
                .long("tool")
                .value_parser(["msgfplus", "msgfdb", "toppic"])
                .help("Search engine that produced the input files (default: detect from header)"),
        )
        .arg(
            Arg::new("no-synopsis")
                .long("no-synopsis")
                .action(clap::ArgAction::SetTrue)
                .help("Do not write `_syn.txt` files"),
        )
        .arg(
            Arg::new("no-first-hits")
                .long("no-first-hits")
                .action(clap::ArgAction::SetTrue)
                .help("Do not write `_fht.txt` files"),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let input = Input::from_arguments(matches)?;

    let runner = input.build().and_then(Runner::new)?;

    let search = runner.run()?;

    let failed = search.files.iter().filter(|f| !f.success).count();
    anyhow::ensure!(
        failed == 0,
        "{} of {} input files were not processed cleanly",
        failed,
        search.files.len()
    );

    Ok(())
}
