use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AnalyzeSignResponse {
    pub success: bool,
    #[serde(flatten)]
    pub analyses: Analyses,
    pub filename: String,
}

/// Response texts keyed the way the page expects for the configured stage count.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Analyses {
    Single {
        analysis: String,
    },
    Staged {
        first_analysis: String,
        second_analysis: String,
    },
    Many {
        analyses: Vec<String>,
    },
}

impl Analyses {
    pub fn from_texts(mut texts: Vec<String>) -> Self {
        match texts.len() {
            1 => Analyses::Single {
                analysis: texts.remove(0),
            },
            2 => {
                let second_analysis = texts.remove(1);
                Analyses::Staged {
                    first_analysis: texts.remove(0),
                    second_analysis,
                }
            }
            _ => Analyses::Many { analyses: texts },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalysisFailureResponse {
    pub success: bool,
    pub error: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
