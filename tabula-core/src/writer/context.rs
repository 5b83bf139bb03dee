use crate::{Mapper, Statement, Value};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    #[default]
    None,
    SqlDeleteFrom,
    SqlDeleteFromWhere,
    SqlInsertInto,
    SqlInsertIntoValues,
    SqlJoin,
    SqlSelect,
    SqlSelectFrom,
    SqlSelectOrderBy,
    SqlSelectWhere,
    SqlUpdate,
    SqlUpdateSet,
    SqlUpdateWhere,
}

/// State carried while a statement is written: the current clause, the table aliases
/// of the query and the parameters bound so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub fragment: Fragment,
    pub qualify_columns: bool,
    pub tables: Vec<(Mapper, String)>,
    pub params: Vec<Value>,
}

impl Context {
    pub fn new(fragment: Fragment, qualify_columns: bool) -> Self {
        Self {
            fragment,
            qualify_columns,
            tables: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Context for a query over `mappers`, aliased `t1..tn` in order.
    pub fn with_tables<'a>(fragment: Fragment, mappers: impl IntoIterator<Item = &'a Mapper>) -> Self {
        Self {
            tables: mappers
                .into_iter()
                .enumerate()
                .map(|(i, m)| (m.clone(), format!("t{}", i + 1)))
                .collect(),
            ..Self::new(fragment, true)
        }
    }

    pub fn alias(&self, mapper: &Mapper) -> Option<&str> {
        self.tables
            .iter()
            .find(|(m, _)| m == mapper)
            .map(|(_, alias)| alias.as_str())
    }

    pub fn into_statement(self, sql: String) -> Statement {
        Statement {
            sql,
            params: self.params,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Fragment::None, true)
    }
}
