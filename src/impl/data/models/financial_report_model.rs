use serde_derive::Deserialize;
use serde_json::{Map, Value};

/// Column-oriented financial report: column definitions plus one value array
/// per row.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FinancialReportResponseModel {
    Enveloped { result: FinancialReportModel },
    Bare(FinancialReportModel),
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FinancialReportModel {
    #[serde(default)]
    pub(crate) columns: Vec<ColumnModel>,
    #[serde(default)]
    pub(crate) rows: Vec<Vec<Value>>,
}

/// Columns come either as plain names or as `{ "name": .., "title": .. }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum ColumnModel {
    Name(String),
    Definition { name: String },
}

impl From<FinancialReportResponseModel> for FinancialReportModel {
    fn from(model: FinancialReportResponseModel) -> Self {
        match model {
            FinancialReportResponseModel::Enveloped { result } => result,
            FinancialReportResponseModel::Bare(report) => report,
        }
    }
}

impl ColumnModel {
    pub(crate) fn name(&self) -> &str {
        match self {
            ColumnModel::Name(name) | ColumnModel::Definition { name } => name,
        }
    }
}

impl FinancialReportModel {
    /// Row-oriented view of the table. Short rows leave trailing columns
    /// absent; extra values past the last column are dropped.
    pub(crate) fn into_records(self) -> Vec<Map<String, Value>> {
        let names: Vec<String> = self.columns.iter().map(|c| c.name().to_string()).collect();
        self.rows
            .into_iter()
            .map(|row| names.iter().cloned().zip(row).collect())
            .collect()
    }
}
