use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use oaskit_core::{
    Casing, CompileOptions, DeclarationEmitter, JsonEmitter, SpecDocument, compile_spec,
};
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// OpenAPI document (`.yaml`/`.yml` for YAML, JSON otherwise)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,
    /// Where the declaration list is written
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
    /// Only compile types
    #[arg(long)]
    pub only_types: bool,
    /// Declare string/number enums as enums instead of aliases
    #[arg(short = 'e', long)]
    pub generate_enums: bool,
    /// Keep schema descriptions and deprecation flags
    #[arg(long)]
    pub docs: bool,
    #[arg(long, value_enum)]
    pub casing: Option<CasingArg>,
    /// TOML file with compile options; flags take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CasingArg {
    Camel,
    Preserve,
}

impl From<CasingArg> for Casing {
    fn from(arg: CasingArg) -> Self {
        match arg {
            CasingArg::Camel => Casing::Camel,
            CasingArg::Preserve => Casing::Preserve,
        }
    }
}

pub fn run(args: GenerateArgs) -> i32 {
    match run_inner(&args) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

fn run_inner(args: &GenerateArgs) -> Result<(), String> {
    let options = options(args)?;
    let text = std::fs::read_to_string(&args.input)
        .map_err(|e| format!("Failed to read {}: {e}", args.input.display()))?;
    let doc = if is_yaml(&args.input) {
        SpecDocument::from_yaml(&text)
    } else {
        SpecDocument::from_json(&text)
    }
    .map_err(|e| e.to_string())?;

    info!(title = %doc.info.title, input = %args.input.display(), "Generating declarations.");
    let declarations = compile_spec(&doc, &options).map_err(|e| e.to_string())?;
    let rendered = JsonEmitter.emit(&declarations).map_err(|e| e.to_string())?;

    if let Some(parent) = args.output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
    }
    std::fs::write(&args.output, rendered)
        .map_err(|e| format!("Failed to write {}: {e}", args.output.display()))?;
    info!(output = %args.output.display(), "Wrote declarations.");
    Ok(())
}

fn options(args: &GenerateArgs) -> Result<CompileOptions, String> {
    let mut options = match &args.config {
        Some(path) => CompileOptions::from_file(path).map_err(|e| e.to_string())?,
        None => CompileOptions::default(),
    };
    options.only_types |= args.only_types;
    options.generate_enums |= args.generate_enums;
    options.include_docs |= args.docs;
    if let Some(casing) = args.casing {
        options.field_casing = casing.into();
    }
    Ok(options)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}
