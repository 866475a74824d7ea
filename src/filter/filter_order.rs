use serde::{Deserialize, Serialize};

use super::types::FilterOrderInfo;

/// Orderings offered on a question's answer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSort {
    Latest,
    Oldest,
    Popular,
}

impl AnswerSort {
    /// Unrecognized or missing filters fall back to `Latest`.
    pub fn parse(filter: Option<&str>) -> Self {
        match filter.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => AnswerSort::Oldest,
            Some("popular") => AnswerSort::Popular,
            _ => AnswerSort::Latest,
        }
    }

    pub fn order(&self) -> Vec<FilterOrderInfo> {
        match self {
            AnswerSort::Latest => vec![FilterOrderInfo::desc("created_at"), FilterOrderInfo::desc("id")],
            AnswerSort::Oldest => vec![FilterOrderInfo::asc("created_at"), FilterOrderInfo::asc("id")],
            AnswerSort::Popular => vec![
                FilterOrderInfo::desc("upvotes"),
                FilterOrderInfo::desc("created_at"),
                FilterOrderInfo::desc("id"),
            ],
        }
    }
}

/// Orderings offered on a user's saved questions; each maps to a question column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedQuestionSort {
    MostRecent,
    Oldest,
    MostVoted,
    MostViewed,
    MostAnswered,
}

impl SavedQuestionSort {
    pub fn parse(filter: Option<&str>) -> Self {
        match filter.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
            Some("oldest") => SavedQuestionSort::Oldest,
            Some("mostvoted") => SavedQuestionSort::MostVoted,
            Some("mostviewed") => SavedQuestionSort::MostViewed,
            Some("mostanswered") => SavedQuestionSort::MostAnswered,
            _ => SavedQuestionSort::MostRecent,
        }
    }

    pub fn order(&self) -> Vec<FilterOrderInfo> {
        let primary = match self {
            SavedQuestionSort::MostRecent => FilterOrderInfo::desc("created_at"),
            SavedQuestionSort::Oldest => FilterOrderInfo::asc("created_at"),
            SavedQuestionSort::MostVoted => FilterOrderInfo::desc("upvotes"),
            SavedQuestionSort::MostViewed => FilterOrderInfo::desc("views"),
            SavedQuestionSort::MostAnswered => FilterOrderInfo::desc("answers"),
        };
        vec![primary, FilterOrderInfo::desc("id")]
    }
}

pub struct FilterOrder;

impl FilterOrder {
    /// Render an ORDER BY clause, qualifying columns with `alias` when given.
    pub fn generate(infos: &[FilterOrderInfo], alias: Option<&str>) -> String {
        if infos.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| match alias {
                Some(a) => format!("{}.\"{}\" {}", a, i.column, i.sort.to_sql()),
                None => format!("\"{}\" {}", i.column, i.sort.to_sql()),
            })
            .collect();
        format!("ORDER BY {}", parts.join(", "))
    }
}
