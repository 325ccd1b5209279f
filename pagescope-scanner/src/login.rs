//! Login form detection.
//!
//! Every `<form>` is captured into a [`FormSnapshot`] and scored independently by
//! [`score_form`]. The page score is the best form score plus one point per auth-related
//! `<meta>`/`<link>` tag, compared against a threshold.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

pub const DEFAULT_LOGIN_THRESHOLD: u32 = 10;

pub const ACTION_WEIGHT: u32 = 3;
pub const PASSWORD_WEIGHT: u32 = 4;
pub const USER_FIELD_WEIGHT: u32 = 3;
pub const SUBMIT_WEIGHT: u32 = 2;
pub const REMEMBER_ME_WEIGHT: u32 = 2;
pub const FORGOT_PASSWORD_WEIGHT: u32 = 2;
pub const SSO_WEIGHT: u32 = 2;

const ACTION_KEYWORDS: [&str; 3] = ["login", "signin", "auth"];
const SUBMIT_KEYWORDS: [&str; 3] = ["login", "sign in", "log in"];
const REMEMBER_ME_KEYWORDS: [&str; 2] = ["remember me", "keep me signed in"];
const SSO_PROVIDERS: [&str; 5] = ["google", "facebook", "github", "twitter", "microsoft"];
const SSO_CLASS_MARKERS: [&str; 3] = ["auth", "login", "oauth"];

static FORM_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("form"));
static INPUT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("input"));
static BUTTON_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("button"));
static LABEL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("label[for]"));
static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static CONTROL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("button, a"));
static AUTH_HINT_SELECTOR: LazyLock<Selector> = LazyLock::new(|| selector("meta[name], link[rel]"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// A clickable element inside a form, used for SSO detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Control {
    pub text: String,
    pub class: String,
}

/// Immutable view of the parts of a form that matter for login scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSnapshot {
    pub action: Option<String>,
    pub password_inputs: usize,
    pub user_inputs: usize,
    /// Text plus value of every submit control.
    pub submit_labels: Vec<String>,
    /// Label text gathered for every checkbox (parent text and `label[for]` text).
    pub checkbox_labels: Vec<String>,
    pub link_texts: Vec<String>,
    pub controls: Vec<Control>,
}

impl FormSnapshot {
    pub fn capture(form: ElementRef<'_>) -> Self {
        let mut snapshot = FormSnapshot {
            action: form.value().attr("action").map(str::to_string),
            ..Default::default()
        };

        for input in form.select(&INPUT_SELECTOR) {
            let element = input.value();
            // a missing type attribute means a text input
            let input_type = element.attr("type").unwrap_or("text").to_ascii_lowercase();

            if input_type == "password" {
                snapshot.password_inputs += 1;
            }
            if is_user_field(&input_type, element.attr("name"), element.attr("id")) {
                snapshot.user_inputs += 1;
            }
            if input_type == "submit" {
                snapshot
                    .submit_labels
                    .push(element.attr("value").unwrap_or_default().to_string());
            }
            if input_type == "checkbox" {
                snapshot.checkbox_labels.push(checkbox_label(form, input));
            }
        }

        for button in form.select(&BUTTON_SELECTOR) {
            let button_type = button
                .value()
                .attr("type")
                .unwrap_or("submit")
                .to_ascii_lowercase();
            if button_type == "submit" {
                let mut label = element_text(button);
                if let Some(value) = button.value().attr("value") {
                    label.push(' ');
                    label.push_str(value);
                }
                snapshot.submit_labels.push(label);
            }
        }

        snapshot.link_texts = form.select(&ANCHOR_SELECTOR).map(element_text).collect();

        snapshot.controls = form
            .select(&CONTROL_SELECTOR)
            .map(|control| Control {
                text: element_text(control),
                class: control.value().attr("class").unwrap_or_default().to_string(),
            })
            .collect();

        snapshot
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn is_user_field(input_type: &str, name: Option<&str>, id: Option<&str>) -> bool {
    if input_type == "text" || input_type == "email" {
        return true;
    }
    [name, id].into_iter().flatten().any(|attr| {
        let attr = attr.to_lowercase();
        attr.contains("username") || attr.contains("email")
    })
}

fn checkbox_label(form: ElementRef<'_>, checkbox: ElementRef<'_>) -> String {
    let mut label = checkbox
        .parent()
        .and_then(ElementRef::wrap)
        .map(element_text)
        .unwrap_or_default();

    if let Some(id) = checkbox.value().attr("id") {
        for associated in form.select(&LABEL_SELECTOR) {
            if associated.value().attr("for") == Some(id) {
                label.push(' ');
                label.push_str(&element_text(associated));
            }
        }
    }

    label
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn is_sso_control(control: &Control) -> bool {
    let text = control.text.to_lowercase();
    let class = control.class.to_lowercase();
    let class_has_marker = contains_any(&class, &SSO_CLASS_MARKERS);

    SSO_PROVIDERS.iter().any(|provider| {
        text.contains(&format!("sign in with {}", provider))
            || text.contains(&format!("login with {}", provider))
            || (class.contains(provider) && class_has_marker)
    })
}

/// Additive login score of a single form.
pub fn score_form(form: &FormSnapshot) -> u32 {
    let mut score = 0;

    if let Some(action) = &form.action
        && contains_any(&action.to_lowercase(), &ACTION_KEYWORDS)
    {
        score += ACTION_WEIGHT;
    }

    if form.password_inputs > 0 {
        score += PASSWORD_WEIGHT;
    }

    if form.user_inputs > 0 {
        score += USER_FIELD_WEIGHT;
    }

    // every matching submit control counts
    let matching_submits = form
        .submit_labels
        .iter()
        .filter(|label| contains_any(&label.to_lowercase(), &SUBMIT_KEYWORDS))
        .count() as u32;
    score += SUBMIT_WEIGHT * matching_submits;

    if form
        .checkbox_labels
        .iter()
        .any(|label| contains_any(&label.to_lowercase(), &REMEMBER_ME_KEYWORDS))
    {
        score += REMEMBER_ME_WEIGHT;
    }

    if form.link_texts.iter().any(|text| {
        let text = text.to_lowercase();
        text.contains("forgot") && text.contains("password")
    }) {
        score += FORGOT_PASSWORD_WEIGHT;
    }

    if form.controls.iter().any(is_sso_control) {
        score += SSO_WEIGHT;
    }

    score
}

/// Count `<meta>`/`<link>` tags that advertise sign-in or auth semantics and whose
/// content mentions auth.
pub fn page_auth_signals(document: &Html) -> u32 {
    document
        .select(&AUTH_HINT_SELECTOR)
        .filter(|element| {
            let element = element.value();
            let hinted = match element.name() {
                "meta" => element.attr("name").is_some_and(|name| {
                    let name = name.to_lowercase();
                    name.contains("sign") || name.contains("auth")
                }),
                "link" => element
                    .attr("rel")
                    .is_some_and(|rel| rel.to_lowercase().contains("authorization")),
                _ => false,
            };
            hinted
                && element
                    .attr("content")
                    .is_some_and(|content| content.to_lowercase().contains("auth"))
        })
        .count() as u32
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginSignals {
    pub forms: Vec<FormSnapshot>,
    pub page_signals: u32,
}

impl LoginSignals {
    pub fn capture(document: &Html) -> Self {
        Self {
            forms: document
                .select(&FORM_SELECTOR)
                .map(FormSnapshot::capture)
                .collect(),
            page_signals: page_auth_signals(document),
        }
    }

    pub fn best_form_score(&self) -> u32 {
        self.forms.iter().map(score_form).max().unwrap_or(0)
    }

    pub fn score(&self) -> u32 {
        self.best_form_score() + self.page_signals
    }

    pub fn is_login_page(&self, threshold: u32) -> bool {
        self.score() >= threshold
    }
}
