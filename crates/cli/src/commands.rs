use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline: extract, transform, and load one archive
    Run {
        #[arg(long, help = "Input order archive (semicolon-separated CSV)")]
        input: String,

        #[arg(long, help = "Staging directory for batch files")]
        staging: String,

        #[arg(long, help = "Target warehouse table")]
        table: String,

        #[arg(long, help = "Base URL of the warehouse REST facade")]
        warehouse_url: String,

        #[arg(
            long,
            default_value = "https://date.nager.at/api/v3/PublicHolidays",
            help = "Base URL of the public-holiday service"
        )]
        holidays_url: String,

        #[arg(long, default_value = "IT", help = "ISO country code for holiday lookups")]
        country: String,

        #[arg(long, help = "Weekly rest day, defaults to Sunday")]
        rest_day: Option<String>,

        #[arg(
            long,
            help = "Divert only colliding records instead of the whole batch"
        )]
        per_record: bool,

        #[arg(long, help = "Checkpoint store directory")]
        state: String,

        #[arg(long, help = "Run date override (YYYY-MM-DD), defaults to today")]
        run_date: Option<chrono::NaiveDate>,
    },
    /// Extract an archive and write the rejection reports, without loading
    Extract {
        #[arg(long, help = "Input order archive (semicolon-separated CSV)")]
        input: String,

        #[arg(long, help = "Directory for the rejection reports")]
        output: String,
    },
    /// Tally value frequencies over an archive's descriptive fields
    Analyze {
        #[arg(long, help = "Input order archive (semicolon-separated CSV)")]
        input: String,

        #[arg(long, help = "Directory for the analysis report")]
        output: String,
    },
    /// Resume an interrupted load from the last checkpoint
    Resume {
        #[arg(long, help = "Staging directory holding the batch files")]
        staging: String,

        #[arg(long, help = "Target warehouse table")]
        table: String,

        #[arg(long, help = "Base URL of the warehouse REST facade")]
        warehouse_url: String,

        #[arg(long, help = "Checkpoint store directory")]
        state: String,

        #[arg(long, help = "Run date of the interrupted run (YYYY-MM-DD)")]
        run_date: chrono::NaiveDate,
    },
}
