use url::Url;

/// Fields to `$select` and `$expand` on a REST query.
///
/// Only additive operations are exposed. A query customizer can extend the
/// base field list but can never drop the parent reference or the child web
/// collection the enumerator depends on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    select: Vec<String>,
    expand: Vec<String>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base query for a web node. Child webs are only requested when walking
    /// the hierarchy.
    pub fn for_web(recursive: bool) -> Self {
        let mut query = Self::new();
        query
            .select_all(["Id", "Title", "ServerRelativeUrl", "Url", "ParentWeb/Id"])
            .expand("ParentWeb");

        if recursive {
            query
                .select_all(["Webs/Id", "Webs/Title", "Webs/ServerRelativeUrl", "Webs/Url"])
                .expand("Webs");
        }

        query
    }

    pub fn select(&mut self, field: impl Into<String>) -> &mut Self {
        push_unique(&mut self.select, field.into());
        self
    }

    pub fn expand(&mut self, field: impl Into<String>) -> &mut Self {
        push_unique(&mut self.expand, field.into());
        self
    }

    pub fn select_all<S: Into<String>>(&mut self, fields: impl IntoIterator<Item = S>) -> &mut Self {
        for field in fields {
            self.select(field);
        }
        self
    }

    pub fn expand_all<S: Into<String>>(&mut self, fields: impl IntoIterator<Item = S>) -> &mut Self {
        for field in fields {
            self.expand(field);
        }
        self
    }

    pub fn selected(&self) -> &[String] {
        &self.select
    }

    pub fn expanded(&self) -> &[String] {
        &self.expand
    }

    pub fn is_empty(&self) -> bool {
        self.select.is_empty() && self.expand.is_empty()
    }

    /// Append `$select` / `$expand` to the URL's query string. Empty lists
    /// are left out.
    pub fn apply(&self, url: &mut Url) {
        if self.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        if !self.select.is_empty() {
            pairs.append_pair("$select", &self.select.join(","));
        }
        if !self.expand.is_empty() {
            pairs.append_pair("$expand", &self.expand.join(","));
        }
    }
}

fn push_unique(fields: &mut Vec<String>, field: String) {
    let field = field.trim().to_string();
    if !field.is_empty() && !fields.contains(&field) {
        fields.push(field);
    }
}
