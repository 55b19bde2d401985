//! Success/failure banners
//!
//! A banner is the only thing a provisioning run writes to stdout.

use std::fmt;

use super::sink::ErrorSink;
use crate::constants::BANNER_SEPARATOR;

/// How failures are listed in a failure banner
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportStyle {
    /// First line of each failure
    Summary,
    /// Every line of each failure, including the captured output
    Full,
}

impl ReportStyle {
    /// Value accepted by `--errors`
    pub fn as_arg(self) -> &'static str {
        match self {
            ReportStyle::Summary => "summary",
            ReportStyle::Full => "full",
        }
    }
}

/// What a pipeline provisions, as named in its banners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    success_heading: Option<String>,
    failure_heading: String,
}

impl Subject {
    /// "<NAME> INSTALADO" / "<NAME> NO INSTALADO"
    pub fn installed(name: &str) -> Self {
        Self {
            success_heading: Some(format!("{} INSTALADO", name)),
            failure_heading: format!("{} NO INSTALADO", name),
        }
    }

    /// "<NAME> CONFIGURADO" / "<NAME> NO CONFIGURADO"
    pub fn configured(name: &str) -> Self {
        Self {
            success_heading: Some(format!("{} CONFIGURADO", name)),
            failure_heading: format!("{} NO CONFIGURADO", name),
        }
    }

    /// Prints nothing on success, only the given heading on failure
    pub fn silent_on_success(failure_heading: &str) -> Self {
        Self {
            success_heading: None,
            failure_heading: failure_heading.to_string(),
        }
    }
}

/// A rendered banner block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    lines: Vec<String>,
}

impl Banner {
    /// Success banner, `None` when the subject stays quiet on success
    pub fn success(subject: &Subject) -> Option<Self> {
        let heading = subject.success_heading.as_ref()?;
        Some(Self {
            lines: vec![
                BANNER_SEPARATOR.to_string(),
                heading.clone(),
                BANNER_SEPARATOR.to_string(),
            ],
        })
    }

    /// Failure banner listing the sink, or `error` alone when the sink is empty
    pub fn failure(subject: &Subject, sink: &ErrorSink, error: &str, style: ReportStyle) -> Self {
        let mut lines = vec![
            BANNER_SEPARATOR.to_string(),
            subject.failure_heading.clone(),
            String::new(),
            "- Errores:".to_string(),
        ];

        if sink.is_empty() {
            lines.push(format!("  - {}", error));
        } else {
            match style {
                ReportStyle::Summary => lines.extend(sink.first_line_summary()),
                ReportStyle::Full => lines.extend(sink.full_dump()),
            }
        }

        lines.push(BANNER_SEPARATOR.to_string());
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Write the banner to stdout
    pub fn print(&self) {
        println!("{}", self);
    }
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}
