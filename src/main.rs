use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use weft::fs_utils::{build_exclude_set, read_file_contents};
use weft::template::{DEFAULT_FILENAME_PATTERN, write_outputs};
use weft::variables::{DEFAULT_KEY_COLUMN, DEFAULT_LOOP_INJECTION_VARIABLE};
use weft::{
    Delimiters, LoadOptions, ReindentPolicy, RenderOptions, Result, TemplateConfig,
    load_variables_file, render_directory, render_template,
};

const LONG_HELP: &str = r#"
Template syntax (default delimiters):
  {{name}}                 - Replaced by the variable "name"
  (items)[                 - Repeats the block once per element of the array "items";
    - {{name}}               inside the block, {{name}} or {{items_name}} is the
  ]                          element's "name" field
  (items)(,)[ ... ]        - Same, iterations separated by ","

Examples:
  # Render one template with JSON data
  weft render --in page.tpl --out page.txt --data data.json
  # Print to stdout, template from stdin
  echo "Hello {{who}}" | weft render --in - --out - --data data.json
  # Render a whole directory
  weft render --mode dir --in templates/ --out build/ --data data.json
  # One output per CSV column, named after a field
  weft render --in card.md --out cards/ --data people.csv --multiple-output \
      --multiple-output-filename-pattern "card-{name}"
  # One output per selected record of a spreadsheet
  weft render --in card.md --out cards/ --data stock.xlsx --multiple-output \
      --data-filter "$[?@.sku == 'a1' || @.sku == 'a2']"
  # Custom delimiters
  weft render --in conf.tpl --out conf --data d.json -l '#{' -r '}#'
  # Serve templates over HTTP
  weft serve --port 8080 --template-dir templates/
"#;

/// Text template renderer with configurable delimiters and loop blocks.
#[derive(Parser, Debug)]
#[command(
    name = "weft",
    version,
    about = "Text template renderer with configurable delimiters and loop blocks.",
    after_long_help = LONG_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single file or a full directory
    Render(RenderArgs),
    /// Serve templates over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Input path (file or dir). Use '-' for stdin in file mode.
    #[arg(short, long = "in", value_name = "PATH")]
    input: PathBuf,

    /// Output path (file or dir). Use '-' for stdout in single-output file mode.
    #[arg(short, long = "out", value_name = "PATH")]
    output: PathBuf,

    /// Variables file (.json or .csv)
    #[arg(short, long, value_name = "FILE")]
    data: PathBuf,

    /// Input mode
    #[arg(short, long, value_enum, default_value = "file")]
    mode: Mode,

    /// CSV/xlsx column holding the variable names
    #[arg(short, long, value_name = "NAME", default_value = DEFAULT_KEY_COLUMN)]
    key_column: String,

    /// JSON pointer selecting part of the data (e.g. /payload/items)
    #[arg(long, value_name = "POINTER")]
    data_pointer: Option<String>,

    /// JSONPath query whose matches become the data (e.g. "$[?@.sku == 'a']")
    #[arg(long, value_name = "QUERY")]
    data_filter: Option<String>,

    /// Write one output per element of the data array
    #[arg(long)]
    multiple_output: bool,

    /// Output name per element; {i} is the index, {field} any scalar field
    #[arg(long, value_name = "PATTERN", default_value = DEFAULT_FILENAME_PATTERN)]
    multiple_output_filename_pattern: String,

    /// Variable an array is bound to in single-output mode
    #[arg(long, value_name = "NAME", default_value = DEFAULT_LOOP_INJECTION_VARIABLE)]
    loop_injection_variable: String,

    #[command(flatten)]
    delimiters: DelimiterArgs,

    /// Fail when a variable token has no value
    #[arg(long)]
    strict: bool,

    /// Handling of loop bodies indented less than their loop tag
    #[arg(long, value_enum, default_value = "preserve")]
    reindent: Reindent,

    /// Exclude glob patterns in dir mode (repeatable), relative to the input dir
    #[arg(short = 'x', long = "exclude", value_name = "GLOB", action = clap::ArgAction::Append)]
    exclude: Vec<String>,
}

#[derive(Args, Debug)]
struct DelimiterArgs {
    /// Left variable delimiter
    #[arg(short, long, value_name = "DELIM", env = "WEFT_LEFT_DELIMITER", default_value = "")]
    left_delimiter: String,

    /// Right variable delimiter
    #[arg(short, long, value_name = "DELIM", env = "WEFT_RIGHT_DELIMITER", default_value = "")]
    right_delimiter: String,

    /// Left loop variable delimiter
    #[arg(long, value_name = "DELIM", env = "WEFT_LEFT_LOOP_VARIABLE_DELIMITER", default_value = "")]
    left_loop_variable_delimiter: String,

    /// Right loop variable delimiter
    #[arg(long, value_name = "DELIM", env = "WEFT_RIGHT_LOOP_VARIABLE_DELIMITER", default_value = "")]
    right_loop_variable_delimiter: String,

    /// Left loop block delimiter
    #[arg(long, value_name = "DELIM", env = "WEFT_LEFT_LOOP_BLOCK_DELIMITER", default_value = "")]
    left_loop_block_delimiter: String,

    /// Right loop block delimiter
    #[arg(long, value_name = "DELIM", env = "WEFT_RIGHT_LOOP_BLOCK_DELIMITER", default_value = "")]
    right_loop_block_delimiter: String,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Directory templates are loaded from and registered into
    #[arg(short, long, value_name = "DIR", env = "WEFT_TEMPLATE_DIR", default_value = "templates")]
    template_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Render a single template file
    File,
    /// Render every file of a directory
    Dir,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Reindent {
    /// Leave under-indented bodies as they are
    Preserve,
    /// Pad under-indented bodies with spaces
    Pad,
    /// Fail on under-indented bodies
    Fail,
}

impl From<Reindent> for ReindentPolicy {
    fn from(value: Reindent) -> Self {
        match value {
            Reindent::Preserve => ReindentPolicy::Preserve,
            Reindent::Pad => ReindentPolicy::Pad,
            Reindent::Fail => ReindentPolicy::Fail,
        }
    }
}

impl From<&DelimiterArgs> for Delimiters {
    fn from(args: &DelimiterArgs) -> Self {
        Delimiters::new(
            &args.left_delimiter,
            &args.right_delimiter,
            &args.left_loop_variable_delimiter,
            &args.right_loop_variable_delimiter,
            &args.left_loop_block_delimiter,
            &args.right_loop_block_delimiter,
        )
    }
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG takes precedence
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(io::stderr)
        .init();

    let result = match cli.command {
        Command::Render(args) => run_render(&args),
        Command::Serve(args) => run_serve(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_render(args: &RenderArgs) -> Result<()> {
    let load_options = LoadOptions {
        key_column: args.key_column.clone(),
        pointer: args.data_pointer.clone(),
        filter: args.data_filter.clone(),
        multiple_output: args.multiple_output,
        loop_injection_variable: args.loop_injection_variable.clone(),
    };
    tracing::info!(data = %args.data.display(), "reading variables");
    let sets = load_variables_file(&args.data, &load_options)?;
    if sets.is_empty() {
        tracing::warn!("variables hold no elements, nothing to render");
    }

    let config = TemplateConfig {
        render: RenderOptions {
            delimiters: Delimiters::from(&args.delimiters),
            strict: args.strict,
            reindent: args.reindent.into(),
        },
        multiple_output: args.multiple_output,
        filename_pattern: args.multiple_output_filename_pattern.clone(),
        exclude: build_exclude_set(&args.exclude)?,
    };

    let outputs = match args.mode {
        Mode::File => {
            let template = read_template(&args.input)?;
            render_template(&template, &args.input, &args.output, &sets, &config)?
        }
        Mode::Dir => render_directory(&args.input, &args.output, &sets, &config)?,
    };

    if is_stdio(&args.output) && !args.multiple_output && matches!(args.mode, Mode::File) {
        let mut stdout = io::stdout();
        for output in &outputs {
            stdout.write_all(output.content.as_bytes())?;
        }
        stdout.flush()?;
    } else {
        write_outputs(&outputs)?;
    }

    tracing::info!(outputs = outputs.len(), "rendering complete");
    Ok(())
}

fn read_template(input: &Path) -> Result<String> {
    if is_stdio(input) {
        tracing::info!("reading template from stdin");
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        tracing::info!(template = %input.display(), "reading template");
        read_file_contents(input)
    }
}

fn is_stdio(path: &Path) -> bool {
    path == Path::new("-")
}

fn run_serve(args: ServeArgs) -> Result<()> {
    let addr = SocketAddr::new(args.host, args.port);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(weft::server::serve(addr, args.template_dir))
}
