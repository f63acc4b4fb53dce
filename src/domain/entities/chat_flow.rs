use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

use super::ConversationSummary;
use crate::domain::errors::{DomainError, DomainResult};

pub const DEFAULT_WELCOME_MESSAGE: &str = "Hi! How can we help you today?";
pub const DEFAULT_EMAIL_CAPTURE_MESSAGE: &str = "Please provide your email to continue";
pub const DEFAULT_ACCENT_COLOR: &str = "#3b82f6";

/// Admin-configured routing rule: any of the comma-separated terms in
/// `keyword` routes the conversation to `team`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTeamPair {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub team: String,
}

impl KeywordTeamPair {
    pub fn new(keyword: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            team: team.into(),
        }
    }

    /// Lower-cased, trimmed, non-empty search terms.
    pub fn terms(&self) -> impl Iterator<Item = String> + '_ {
        self.keyword
            .split(',')
            .map(|term| term.trim().to_lowercase())
            .filter(|term| !term.is_empty())
    }

    /// A rule matches nothing unless it has a team and at least one term.
    pub fn is_routable(&self) -> bool {
        !self.team.trim().is_empty() && self.terms().next().is_some()
    }

    pub fn validate(&self, index: usize) -> DomainResult<()> {
        if self.keyword.trim().is_empty() {
            return Err(DomainError::ValidationError(format!(
                "keywordTeamPairs[{}].keyword must not be empty",
                index
            )));
        }
        if self.team.trim().is_empty() {
            return Err(DomainError::ValidationError(format!(
                "keywordTeamPairs[{}].team must not be empty",
                index
            )));
        }
        if self.terms().next().is_none() {
            return Err(DomainError::ValidationError(format!(
                "keywordTeamPairs[{}].keyword contains no usable terms",
                index
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailCaptureWhen {
    #[default]
    Never,
    BeforeConversation,
    AfterFirstMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatPlacement {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetLanguage {
    #[default]
    English,
    Spanish,
    French,
    German,
}

impl fmt::Display for WidgetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WidgetLanguage::English => write!(f, "english"),
            WidgetLanguage::Spanish => write!(f, "spanish"),
            WidgetLanguage::French => write!(f, "french"),
            WidgetLanguage::German => write!(f, "german"),
        }
    }
}

/// Display and capture settings. Not read by routing, stored as one JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatFlowSettings {
    pub welcome_message: String,
    pub show_avatar: bool,
    pub enable_knowledge_base: bool,
    pub email_capture_when: EmailCaptureWhen,
    pub email_capture_message: String,
    pub website_url: Option<String>,
    pub show_on_all_pages: bool,
    pub specific_pages: Option<String>,
    pub exclude_pages: Option<String>,
    pub accent_color: String,
    pub chat_placement: ChatPlacement,
    pub chat_avatar: Option<String>,
    pub language: WidgetLanguage,
    pub require_consent: bool,
    pub enable_feedback: bool,
}

impl Default for ChatFlowSettings {
    fn default() -> Self {
        Self {
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            show_avatar: true,
            enable_knowledge_base: false,
            email_capture_when: EmailCaptureWhen::Never,
            email_capture_message: DEFAULT_EMAIL_CAPTURE_MESSAGE.to_string(),
            website_url: None,
            show_on_all_pages: true,
            specific_pages: None,
            exclude_pages: None,
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
            chat_placement: ChatPlacement::BottomRight,
            chat_avatar: None,
            language: WidgetLanguage::English,
            require_consent: false,
            enable_feedback: false,
        }
    }
}

impl ChatFlowSettings {
    pub fn validate(&self) -> DomainResult<()> {
        if !accent_color_pattern().is_match(&self.accent_color) {
            return Err(DomainError::ValidationError(
                "accentColor must be a hex colour like #3b82f6".to_string(),
            ));
        }
        validate_optional_url("websiteUrl", self.website_url.as_deref())?;
        validate_optional_url("chatAvatar", self.chat_avatar.as_deref())?;
        Ok(())
    }

    /// Empty strings from form submissions mean "unset".
    fn normalize(mut self) -> Self {
        self.website_url = non_blank(self.website_url);
        self.chat_avatar = non_blank(self.chat_avatar);
        self.specific_pages = non_blank(self.specific_pages);
        self.exclude_pages = non_blank(self.exclude_pages);
        self
    }
}

/// Live-chat widget configuration with its own routing rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFlow {
    pub id: String,
    pub chat_id: String,
    pub name: String,
    pub company_name: String,
    pub owner_user_id: String,
    pub auto_assign_conversations: bool,
    pub keyword_team_pairs: Vec<KeywordTeamPair>,
    pub fallback_team: Option<String>,
    pub is_active: bool,
    #[serde(flatten)]
    pub settings: ChatFlowSettings,
    pub created_at: String,
    pub updated_at: String,
}

/// The subset of a ChatFlow the assignment committer reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatFlowRouting {
    pub chat_flow_id: String,
    pub auto_assign_conversations: bool,
    pub keyword_team_pairs: Vec<KeywordTeamPair>,
    pub fallback_team: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatFlowRequest {
    pub chat_id: String,
    pub name: String,
    pub company_name: String,
    pub owner_user_id: String,
    #[serde(default)]
    pub auto_assign_conversations: bool,
    #[serde(default)]
    pub keyword_team_pairs: Vec<KeywordTeamPair>,
    #[serde(default)]
    pub fallback_team: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(flatten)]
    pub settings: ChatFlowSettings,
}

impl CreateChatFlowRequest {
    pub fn validate(&self) -> DomainResult<()> {
        validate_chat_id(&self.chat_id)?;
        validate_length("name", &self.name, 255)?;
        validate_length("companyName", &self.company_name, 255)?;
        if self.owner_user_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "ownerUserId is required".to_string(),
            ));
        }
        validate_pairs(&self.keyword_team_pairs)?;
        self.settings.validate()
    }
}

impl ChatFlow {
    pub fn new(request: CreateChatFlowRequest) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id: request.chat_id,
            name: request.name,
            company_name: request.company_name,
            owner_user_id: request.owner_user_id,
            auto_assign_conversations: request.auto_assign_conversations,
            keyword_team_pairs: request.keyword_team_pairs,
            fallback_team: non_blank(request.fallback_team),
            is_active: request.is_active,
            settings: request.settings.normalize(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Applies a partial update. `id`, `chat_id` and `created_at` never change.
    pub fn apply_update(&mut self, update: UpdateChatFlowRequest) -> DomainResult<()> {
        update.validate()?;

        let mut settings = self.settings.clone();
        update.settings.apply_to(&mut settings);
        let settings = settings.normalize();
        settings.validate()?;

        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(company_name) = update.company_name {
            self.company_name = company_name;
        }
        if let Some(owner_user_id) = update.owner_user_id {
            self.owner_user_id = owner_user_id;
        }
        if let Some(auto_assign) = update.auto_assign_conversations {
            self.auto_assign_conversations = auto_assign;
        }
        if let Some(pairs) = update.keyword_team_pairs {
            self.keyword_team_pairs = pairs;
        }
        if let Some(fallback_team) = update.fallback_team {
            self.fallback_team = non_blank(Some(fallback_team));
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        self.settings = settings;
        self.updated_at = Utc::now().to_rfc3339();
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatFlowRequest {
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub owner_user_id: Option<String>,
    pub auto_assign_conversations: Option<bool>,
    pub keyword_team_pairs: Option<Vec<KeywordTeamPair>>,
    pub fallback_team: Option<String>,
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub settings: ChatFlowSettingsPatch,
}

/// Display settings present in an update request; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFlowSettingsPatch {
    pub welcome_message: Option<String>,
    pub show_avatar: Option<bool>,
    pub enable_knowledge_base: Option<bool>,
    pub email_capture_when: Option<EmailCaptureWhen>,
    pub email_capture_message: Option<String>,
    pub website_url: Option<String>,
    pub show_on_all_pages: Option<bool>,
    pub specific_pages: Option<String>,
    pub exclude_pages: Option<String>,
    pub accent_color: Option<String>,
    pub chat_placement: Option<ChatPlacement>,
    pub chat_avatar: Option<String>,
    pub language: Option<WidgetLanguage>,
    pub require_consent: Option<bool>,
    pub enable_feedback: Option<bool>,
}

impl ChatFlowSettingsPatch {
    fn apply_to(self, settings: &mut ChatFlowSettings) {
        if let Some(v) = self.welcome_message {
            settings.welcome_message = v;
        }
        if let Some(v) = self.show_avatar {
            settings.show_avatar = v;
        }
        if let Some(v) = self.enable_knowledge_base {
            settings.enable_knowledge_base = v;
        }
        if let Some(v) = self.email_capture_when {
            settings.email_capture_when = v;
        }
        if let Some(v) = self.email_capture_message {
            settings.email_capture_message = v;
        }
        if let Some(v) = self.website_url {
            settings.website_url = Some(v);
        }
        if let Some(v) = self.show_on_all_pages {
            settings.show_on_all_pages = v;
        }
        if let Some(v) = self.specific_pages {
            settings.specific_pages = Some(v);
        }
        if let Some(v) = self.exclude_pages {
            settings.exclude_pages = Some(v);
        }
        if let Some(v) = self.accent_color {
            settings.accent_color = v;
        }
        if let Some(v) = self.chat_placement {
            settings.chat_placement = v;
        }
        if let Some(v) = self.chat_avatar {
            settings.chat_avatar = Some(v);
        }
        if let Some(v) = self.language {
            settings.language = v;
        }
        if let Some(v) = self.require_consent {
            settings.require_consent = v;
        }
        if let Some(v) = self.enable_feedback {
            settings.enable_feedback = v;
        }
    }
}

impl UpdateChatFlowRequest {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            validate_length("name", name, 255)?;
        }
        if let Some(company_name) = &self.company_name {
            validate_length("companyName", company_name, 255)?;
        }
        if let Some(owner) = &self.owner_user_id {
            if owner.trim().is_empty() {
                return Err(DomainError::ValidationError(
                    "ownerUserId must not be empty".to_string(),
                ));
            }
        }
        if let Some(pairs) = &self.keyword_team_pairs {
            validate_pairs(pairs)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatFlowStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFlowQuery {
    pub owner_user_id: Option<String>,
    pub is_active: Option<bool>,
    pub chat_id: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub const DEFAULT_PAGE_LIMIT: i64 = 50;
pub const MAX_PAGE_LIMIT: i64 = 100;

impl ChatFlowQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }

    pub fn validate(&self) -> DomainResult<()> {
        let limit = self.limit();
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(DomainError::ValidationError(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        if self.offset() < 0 {
            return Err(DomainError::ValidationError(
                "offset must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Public configuration served to the embedded widget.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub id: String,
    pub chat_id: String,
    pub name: String,
    pub company_name: String,
    pub welcome_message: String,
    pub accent_color: String,
    pub chat_placement: ChatPlacement,
    pub show_avatar: bool,
    pub enable_knowledge_base: bool,
    pub require_consent: bool,
    pub email_capture_when: EmailCaptureWhen,
    pub email_capture_message: String,
    pub website_url: Option<String>,
    pub language: WidgetLanguage,
}

impl From<ChatFlow> for WidgetConfig {
    fn from(flow: ChatFlow) -> Self {
        let settings = flow.settings;
        Self {
            id: flow.id,
            chat_id: flow.chat_id,
            name: flow.name,
            company_name: flow.company_name,
            welcome_message: settings.welcome_message,
            accent_color: settings.accent_color,
            chat_placement: settings.chat_placement,
            show_avatar: settings.show_avatar,
            enable_knowledge_base: settings.enable_knowledge_base,
            require_consent: settings.require_consent,
            email_capture_when: settings.email_capture_when,
            email_capture_message: settings.email_capture_message,
            website_url: settings.website_url,
            language: settings.language,
        }
    }
}

/// A chat flow together with the conversations opened against it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFlowDetail {
    #[serde(flatten)]
    pub chat_flow: ChatFlow,
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFlowPage {
    pub data: Vec<ChatFlow>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

fn chat_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\-_]+$").expect("valid chat id pattern"))
}

fn accent_color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid colour pattern"))
}

fn validate_chat_id(chat_id: &str) -> DomainResult<()> {
    validate_length("chatId", chat_id, 100)?;
    if !chat_id_pattern().is_match(chat_id) {
        return Err(DomainError::ValidationError(
            "chatId may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }
    Ok(())
}

fn validate_length(field: &str, value: &str, max: usize) -> DomainResult<()> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(DomainError::ValidationError(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(DomainError::ValidationError(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn validate_pairs(pairs: &[KeywordTeamPair]) -> DomainResult<()> {
    pairs
        .iter()
        .enumerate()
        .try_for_each(|(index, pair)| pair.validate(index))
}

fn validate_optional_url(field: &str, value: Option<&str>) -> DomainResult<()> {
    match value.map(str::trim) {
        None | Some("") => Ok(()),
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
        Some(_) => Err(DomainError::ValidationError(format!(
            "{} must be an http(s) URL",
            field
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
