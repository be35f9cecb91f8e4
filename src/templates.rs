use std::sync::Arc;

use chrono::{Datelike, Local};
use handlebars::{Handlebars, TemplateError};
use serde::Serialize;

use crate::session::Flash;

const LAYOUT: (&str, &str) = ("layout", include_str!("../templates/layout.hbs"));

const PAGES: &[(&str, &str)] = &[
    ("index", include_str!("../templates/index.hbs")),
    ("events", include_str!("../templates/events.hbs")),
    ("register", include_str!("../templates/register.hbs")),
    ("feedback", include_str!("../templates/feedback.hbs")),
    ("success", include_str!("../templates/success.hbs")),
    ("error", include_str!("../templates/error.hbs")),
    ("admin/login", include_str!("../templates/admin/login.hbs")),
    ("admin/dashboard", include_str!("../templates/admin/dashboard.hbs")),
    ("admin/events_dashboard", include_str!("../templates/admin/events_dashboard.hbs")),
    (
        "admin/registrations_dashboard",
        include_str!("../templates/admin/registrations_dashboard.hbs"),
    ),
    ("admin/feedback_dashboard", include_str!("../templates/admin/feedback_dashboard.hbs")),
    ("admin/students", include_str!("../templates/admin/students.hbs")),
    ("admin/events", include_str!("../templates/admin/events.hbs")),
    ("admin/registrations", include_str!("../templates/admin/registrations.hbs")),
    ("admin/feedback", include_str!("../templates/admin/feedback.hbs")),
];

/// Fields every page gets next to its own content.
#[derive(Serialize)]
pub struct Page<'a, T> {
    pub title: &'a str,
    pub flashes: &'a [Flash],
    pub admin: Option<&'a str>,
    pub current_year: i32,
    #[serde(flatten)]
    pub inner: T,
}

impl<'a, T> Page<'a, T> {
    pub fn new(title: &'a str, flashes: &'a [Flash], admin: Option<&'a str>, inner: T) -> Self {
        Self {
            title,
            flashes,
            admin,
            current_year: Local::now().year(),
            inner,
        }
    }
}

#[derive(Clone)]
pub struct Templates {
    registry: Arc<Handlebars<'static>>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_partial(LAYOUT.0, LAYOUT.1)?;
        for (name, source) in PAGES {
            registry.register_template_string(name, source)?;
        }
        Ok(Self {
            registry: Arc::new(registry),
        })
    }

    pub fn render<T: Serialize>(
        &self,
        name: &str,
        page: &Page<'_, T>,
    ) -> Result<String, handlebars::RenderError> {
        self.registry.render(name, page)
    }
}
