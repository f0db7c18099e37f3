/// Subject and plain-text body ready to be handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub subject: String,
    pub body: String,
}

/// Template using `{{variable}}` placeholders.
#[derive(Debug, Clone)]
pub struct Template {
    pub subject: String,
    pub body: String,
}

impl Template {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// The message sent once a new account has been created.
    pub fn welcome() -> Self {
        Self::new(
            "Welcome to {{service}}!",
            "Welcome, {{name}}!\n\
             \n\
             We are glad to have you with us.\n\
             \n\
             Your account has been created and is ready to use.\n\
             \n\
             If you have any questions, reach out to our support team.\n\
             \n\
             Best regards,\n\
             The {{service}} team\n",
        )
    }

    pub fn render(&self, data: &[(&str, &str)]) -> RenderedContent {
        RenderedContent {
            subject: render_string(&self.subject, data),
            body: render_string(&self.body, data),
        }
    }
}

fn render_string(template: &str, data: &[(&str, &str)]) -> String {
    let mut result = template.to_string();

    for (key, value) in data {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}
