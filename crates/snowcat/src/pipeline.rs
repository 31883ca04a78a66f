//! Read, parse, render and write one document.
//!
//! A [`Pipeline`] is the rebuild action of a watch session and also runs
//! once for plain `html`/`json`/`apib` invocations.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, SecondsFormat};

use snowcat_blueprint::Parser;

use crate::render::{self, Format, TemplateSource};
use crate::watch::{RebuildAction, RebuildError, RebuildOutcome};

/// Where rendered output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Output::Stdout => None,
            Output::File(path) => Some(path),
        }
    }
}

pub struct Pipeline {
    input: PathBuf,
    format: Format,
    output: Output,
    template: TemplateSource,
    parser: Arc<dyn Parser>,
}

impl Pipeline {
    pub fn new(input: impl Into<PathBuf>, format: Format, parser: Arc<dyn Parser>) -> Self {
        Self {
            input: input.into(),
            format,
            output: Output::Stdout,
            template: TemplateSource::default(),
            parser,
        }
    }

    pub fn with_output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn with_template(mut self, template: TemplateSource) -> Self {
        self.template = template;
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    /// The template file to watch alongside the input, for HTML output.
    pub fn template_path(&self) -> Option<&Path> {
        match self.format {
            Format::Html => self.template.path(),
            _ => None,
        }
    }

    /// Produce the rendered bytes without writing them.
    pub fn render(&self) -> Result<String, RebuildError> {
        let source = snowcat_blueprint::read(&self.input)?;
        let rendered = match self.format {
            Format::Apib => render::apib(&source),
            Format::Json => render::json(&self.parser.parse(&source)?)?,
            Format::Html => {
                let document = self.parser.parse(&source)?;
                render::html(&self.template.load()?, &document)
            }
        };
        Ok(rendered)
    }

    /// Render and write. Returns the "has been generated!" notice for file
    /// output.
    pub fn run(&self) -> RebuildOutcome {
        let rendered = self.render()?;

        match &self.output {
            Output::Stdout => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{rendered}").map_err(|source| RebuildError::Write {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
                Ok(None)
            }
            Output::File(path) => {
                fs::write(path, rendered).map_err(|source| RebuildError::Write {
                    path: path.clone(),
                    source,
                })?;
                Ok(Some(self.notice(path)))
            }
        }
    }

    fn notice(&self, path: &Path) -> String {
        let message = format!("{}: {} has been generated!", path.display(), self.format.label());
        match self.format {
            Format::Html => format!(
                "[{}] {message}",
                Local::now().to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            _ => message,
        }
    }
}

impl RebuildAction for Pipeline {
    fn rebuild(&self) -> RebuildOutcome {
        self.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snowcat_blueprint::BlueprintParser;
    use tempfile::TempDir;

    const API: &str = "# Notes API\n\n## Notes [/notes]\n\n### List [GET]\n\n+ Response 200 (application/json)\n\n        []\n";

    fn setup() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("api.apib");
        fs::write(&input, API).unwrap();
        (dir, input)
    }

    fn parser() -> Arc<dyn Parser> {
        Arc::new(BlueprintParser::new())
    }

    #[test]
    fn test_html_to_file() {
        let (dir, input) = setup();
        let output = dir.path().join("index.html");
        let pipeline = Pipeline::new(&input, Format::Html, parser())
            .with_output(Output::File(output.clone()));

        let notice = pipeline.run().unwrap().unwrap();
        assert!(notice.starts_with('['));
        assert!(notice.ends_with("index.html: HTML has been generated!"));

        let html = fs::read_to_string(&output).unwrap();
        assert!(html.contains("<title>Notes API</title>"));
        assert!(html.contains("/notes"));
    }

    #[test]
    fn test_json_and_apib_notices() {
        let (dir, input) = setup();

        let out = dir.path().join("api.json");
        let notice = Pipeline::new(&input, Format::Json, parser())
            .with_output(Output::File(out.clone()))
            .run()
            .unwrap()
            .unwrap();
        assert_eq!(
            notice,
            format!("{}: API element JSON has been generated!", out.display())
        );

        let out = dir.path().join("full.apib");
        let notice = Pipeline::new(&input, Format::Apib, parser())
            .with_output(Output::File(out.clone()))
            .run()
            .unwrap()
            .unwrap();
        assert_eq!(
            notice,
            format!("{}: API blueprint has been generated!", out.display())
        );
        assert_eq!(fs::read_to_string(&out).unwrap(), API);
    }

    #[test]
    fn test_apib_expands_includes() {
        let (dir, _input) = setup();
        let main = dir.path().join("main.apib");
        fs::write(&main, "<!-- include(api.apib) -->\n").unwrap();

        let rendered = Pipeline::new(&main, Format::Apib, parser()).render().unwrap();
        assert_eq!(rendered, API);
    }

    #[test]
    fn test_invalid_document_is_a_parse_error() {
        let (dir, _input) = setup();
        let broken = dir.path().join("broken.apib");
        fs::write(&broken, "# API\n\n## R [/r]\n\n### A [GET]\n\n+ Response 999\n").unwrap();

        let result = Pipeline::new(&broken, Format::Json, parser()).run();
        assert!(matches!(result, Err(RebuildError::Parse(_))));
    }

    #[test]
    fn test_missing_input_and_unwritable_output() {
        let (dir, input) = setup();

        let missing = Pipeline::new(dir.path().join("nope.apib"), Format::Apib, parser()).run();
        assert!(matches!(missing, Err(RebuildError::Parse(_))));

        let unwritable = Pipeline::new(&input, Format::Apib, parser())
            .with_output(Output::File(dir.path().join("no/such/dir/out.apib")))
            .run();
        assert!(matches!(unwritable, Err(RebuildError::Write { .. })));
    }

    #[test]
    fn test_template_path_only_for_html() {
        let (dir, input) = setup();
        let template = dir.path().join("t.html");
        fs::write(&template, "{{content}}").unwrap();
        let source = TemplateSource::File(template.clone());

        let html = Pipeline::new(&input, Format::Html, parser()).with_template(source.clone());
        assert_eq!(html.template_path(), Some(template.as_path()));

        let json = Pipeline::new(&input, Format::Json, parser()).with_template(source);
        assert_eq!(json.template_path(), None);
    }
}
