//! List view state carried in the URL
//!
//! Search term, sort order, visible columns and page (plus the optional date
//! filter and advanced search criteria) are decoded from query parameters on
//! every request and encoded back into every link the page renders. A
//! `QueryState` is never mutated in place: transitions such as
//! [`QueryState::header_sort`] return a new value.

use serde::Deserialize;

use crate::schema::{TableDescriptor, ACTION_COLUMNS};

/// Raw query parameters of the list route
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub visible: Option<String>,
    pub page: Option<String>,
    pub date: Option<String>,
    pub adv: Option<String>,
    #[serde(rename = "match")]
    pub match_logic: Option<String>,
    pub csv: Option<String>,
}

impl ListParams {
    pub fn wants_csv(&self) -> bool {
        self.csv.as_deref() == Some("1")
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Anything other than "desc" is ascending
    pub fn parse(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// One entry of the sort list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }
}

/// Inclusive date range on one date column; bounds are `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFilter {
    pub column: String,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Comparison used by an advanced search criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOperator {
    Contains,
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    StartsWith,
    EndsWith,
}

impl SearchOperator {
    pub const ALL: [SearchOperator; 7] = [
        SearchOperator::Contains,
        SearchOperator::Equals,
        SearchOperator::NotEquals,
        SearchOperator::GreaterThan,
        SearchOperator::LessThan,
        SearchOperator::StartsWith,
        SearchOperator::EndsWith,
    ];

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|operator| operator.as_token() == token)
    }

    pub fn as_token(self) -> &'static str {
        match self {
            SearchOperator::Contains => "contains",
            SearchOperator::Equals => "eq",
            SearchOperator::NotEquals => "ne",
            SearchOperator::GreaterThan => "gt",
            SearchOperator::LessThan => "lt",
            SearchOperator::StartsWith => "starts",
            SearchOperator::EndsWith => "ends",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SearchOperator::Contains => "Contains",
            SearchOperator::Equals => "Equals",
            SearchOperator::NotEquals => "Not Equals",
            SearchOperator::GreaterThan => "Greater Than",
            SearchOperator::LessThan => "Less Than",
            SearchOperator::StartsWith => "Starts With",
            SearchOperator::EndsWith => "Ends With",
        }
    }
}

/// One advanced search condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub column: String,
    pub operator: SearchOperator,
    pub value: String,
}

/// How advanced search criteria combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchLogic {
    #[default]
    All,
    Any,
}

impl MatchLogic {
    pub fn parse(token: &str) -> Self {
        if token.eq_ignore_ascii_case("any") {
            MatchLogic::Any
        } else {
            MatchLogic::All
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            MatchLogic::All => "all",
            MatchLogic::Any => "any",
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            MatchLogic::All => " AND ",
            MatchLogic::Any => " OR ",
        }
    }
}

/// Advanced search criteria and how they combine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdvancedSearch {
    pub criteria: Vec<Criterion>,
    pub logic: MatchLogic,
}

impl AdvancedSearch {
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

/// Decoded view state for one list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub search: String,
    pub sort: Vec<SortKey>,

    /// Visible data columns in table order, followed by the action columns
    pub visible: Vec<String>,
    pub page: u64,
    pub date_filter: Option<DateFilter>,
    pub advanced: AdvancedSearch,
}

impl QueryState {
    /// Default state for a table: no search, no sort, default columns, page 1
    pub fn initial(table: &TableDescriptor) -> Self {
        Self {
            search: String::new(),
            sort: Vec::new(),
            visible: with_action_columns(default_visible(table)),
            page: 1,
            date_filter: None,
            advanced: AdvancedSearch::default(),
        }
    }

    /// Rebuild the state from request parameters; malformed input degrades silently
    pub fn decode(params: &ListParams, table: &TableDescriptor) -> Self {
        Self {
            search: params.search.clone().unwrap_or_default(),
            sort: decode_sort(params.sort.as_deref().unwrap_or(""), table),
            visible: with_action_columns(decode_visible(params.visible.as_deref(), table)),
            page: decode_page(params.page.as_deref()),
            date_filter: params
                .date
                .as_deref()
                .and_then(|token| decode_date_filter(token, table)),
            advanced: AdvancedSearch {
                criteria: params
                    .adv
                    .as_deref()
                    .map(|token| decode_criteria(token, table))
                    .unwrap_or_default(),
                logic: params
                    .match_logic
                    .as_deref()
                    .map(MatchLogic::parse)
                    .unwrap_or_default(),
            },
        }
    }

    /// URL of the list page for this state
    pub fn encode(&self, base_path: &str, table: &str) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        if !self.search.is_empty() {
            pairs.push(("search", self.search.clone()));
        }
        if !self.sort.is_empty() {
            pairs.push(("sort", self.sort_token()));
        }
        pairs.push(("visible", self.visible_token()));
        if let Some(filter) = &self.date_filter {
            pairs.push((
                "date",
                format!(
                    "{},{},{}",
                    filter.column,
                    filter.from.as_deref().unwrap_or(""),
                    filter.to.as_deref().unwrap_or("")
                ),
            ));
        }
        if !self.advanced.is_empty() {
            pairs.push(("adv", self.advanced_token()));
            if self.advanced.logic != MatchLogic::default() {
                pairs.push(("match", self.advanced.logic.as_token().to_string()));
            }
        }
        if self.page > 1 {
            pairs.push(("page", self.page.to_string()));
        }

        let query = pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}/{}?{}", base_path, urlencoding::encode(table), query)
    }

    /// URL of the CSV export for this state
    pub fn encode_csv(&self, base_path: &str, table: &str) -> String {
        format!("{}&csv=1", self.encode(base_path, table))
    }

    /// Compact `col,dir,col,dir` form, also used as the `data-sort` attribute
    pub fn sort_token(&self) -> String {
        self.sort
            .iter()
            .map(|key| format!("{},{}", key.column, key.direction.as_token()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Comma-joined visible data columns (action columns are implicit)
    pub fn visible_token(&self) -> String {
        self.visible_data_columns().collect::<Vec<_>>().join(",")
    }

    /// `column:operator:value` entries joined by `;`, with column and value
    /// percent-encoded so they may contain either separator
    pub fn advanced_token(&self) -> String {
        self.advanced
            .criteria
            .iter()
            .map(|criterion| {
                format!(
                    "{}:{}:{}",
                    urlencoding::encode(&criterion.column),
                    criterion.operator.as_token(),
                    urlencoding::encode(&criterion.value)
                )
            })
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn is_visible(&self, column: &str) -> bool {
        self.visible.iter().any(|name| name == column)
    }

    pub fn visible_data_columns(&self) -> impl Iterator<Item = &str> {
        self.visible
            .iter()
            .map(String::as_str)
            .filter(|name| !ACTION_COLUMNS.contains(name))
    }

    /// Direction of `column` in the sort list, if sorted
    pub fn sort_direction(&self, column: &str) -> Option<SortDirection> {
        self.sort
            .iter()
            .find(|key| key.column == column)
            .map(|key| key.direction)
    }

    /// State after clicking the header of `column`
    ///
    /// A plain click toggles the direction when `column` is the only sort key
    /// and otherwise sorts by `column` ascending alone. A shift-click toggles
    /// `column` in place or appends it ascending, keeping the other keys.
    pub fn header_sort(&self, column: &str, shift: bool) -> Self {
        let mut sort = self.sort.clone();

        if shift {
            match sort.iter_mut().find(|key| key.column == column) {
                Some(key) => key.direction = key.direction.toggled(),
                None => sort.push(SortKey::ascending(column)),
            }
        } else {
            sort = match sort.as_slice() {
                [only] if only.column == column => vec![SortKey {
                    column: column.to_string(),
                    direction: only.direction.toggled(),
                }],
                _ => vec![SortKey::ascending(column)],
            };
        }

        Self {
            sort,
            page: 1,
            ..self.clone()
        }
    }

    pub fn with_page(&self, page: u64) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Whether any server-side filter narrows the result set
    pub fn is_filtered(&self) -> bool {
        !self.search.is_empty() || self.date_filter.is_some() || !self.advanced.is_empty()
    }
}

fn default_visible(table: &TableDescriptor) -> Vec<String> {
    let flagged: Vec<String> = table
        .columns
        .iter()
        .filter(|column| column.visible)
        .map(|column| column.name.clone())
        .collect();

    if flagged.is_empty() {
        table.columns.iter().map(|column| column.name.clone()).collect()
    } else {
        flagged
    }
}

fn with_action_columns(mut visible: Vec<String>) -> Vec<String> {
    for action in ACTION_COLUMNS {
        if !visible.iter().any(|name| name == action) {
            visible.push(action.to_string());
        }
    }
    visible
}

fn decode_sort(token: &str, table: &TableDescriptor) -> Vec<SortKey> {
    let parts: Vec<&str> = token.split(',').collect();
    let mut sort: Vec<SortKey> = Vec::new();

    for pair in parts.chunks(2) {
        let column = pair[0].trim();
        if !table.has_column(column) {
            continue;
        }
        let direction = pair
            .get(1)
            .map(|direction| SortDirection::parse(direction))
            .unwrap_or(SortDirection::Ascending);

        match sort.iter_mut().find(|key| key.column == column) {
            Some(existing) => existing.direction = direction,
            None => sort.push(SortKey {
                column: column.to_string(),
                direction,
            }),
        }
    }

    sort
}

fn decode_visible(token: Option<&str>, table: &TableDescriptor) -> Vec<String> {
    let Some(token) = token else {
        return default_visible(table);
    };

    let requested: Vec<&str> = token.split(',').map(str::trim).collect();
    let visible: Vec<String> = table
        .columns
        .iter()
        .filter(|column| requested.contains(&column.name.as_str()))
        .map(|column| column.name.clone())
        .collect();

    if visible.is_empty() {
        default_visible(table)
    } else {
        visible
    }
}

fn decode_page(token: Option<&str>) -> u64 {
    token
        .and_then(|page| page.trim().parse::<u64>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
}

/// `YYYY-MM-DD` shape check; the database does the real comparison
pub(crate) fn is_iso_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}

fn decode_date_filter(token: &str, table: &TableDescriptor) -> Option<DateFilter> {
    let mut parts = token.splitn(3, ',');
    let column = parts.next()?.trim();
    let bound = |value: Option<&str>| {
        value
            .map(str::trim)
            .filter(|value| is_iso_date(value))
            .map(str::to_string)
    };
    let from = bound(parts.next());
    let to = bound(parts.next());

    let known = table.column(column).is_some_and(|column| column.date_column);
    if !known || (from.is_none() && to.is_none()) {
        return None;
    }

    Some(DateFilter {
        column: column.to_string(),
        from,
        to,
    })
}

fn decode_criteria(token: &str, table: &TableDescriptor) -> Vec<Criterion> {
    token
        .split(';')
        .filter_map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let column = urlencoding::decode(parts.next()?.trim()).ok()?;
            let operator = SearchOperator::parse(parts.next()?.trim())?;
            let value = urlencoding::decode(parts.next()?).ok()?;
            if !table.has_column(&column) || value.is_empty() {
                return None;
            }
            Some(Criterion {
                column: column.into_owned(),
                operator,
                value: value.into_owned(),
            })
        })
        .collect()
}
