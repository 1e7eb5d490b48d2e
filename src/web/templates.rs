use askama::Template;

/// File listing page
#[derive(Template)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) user_name: String,
    pub(crate) files: Vec<String>,
    pub(crate) notices: Vec<String>,
}

/// Error page template
#[derive(Template)]
#[template(path = "error.html")]
pub(crate) struct ErrorTemplate {
    pub(crate) error_message: String,
}
