use clap::Args;

#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Template files to format (use '-' for stdin)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Exit with code 1 if any file would be reformatted, without writing
    #[arg(long)]
    pub check: bool,

    /// Language id to use instead of guessing from the file extension
    #[arg(long)]
    pub language_id: Option<String>,

    /// Python interpreter that has djLint installed
    #[arg(long)]
    pub python: Option<String>,
}

#[derive(Args, Debug)]
pub struct LintArgs {
    /// Template files to lint (use '-' for stdin)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Language id to use instead of guessing from the file extension
    #[arg(long)]
    pub language_id: Option<String>,

    /// Python interpreter that has djLint installed
    #[arg(long)]
    pub python: Option<String>,
}
