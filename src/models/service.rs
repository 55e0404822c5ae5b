use serde::{Deserialize, Serialize};

use super::duration::{IsoDuration, DEFAULT_SERVICE_DURATION, ZERO_MINUTES};
use super::SchedulingPolicy;

/// A question reference attached to a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceQuestion {
    pub question_id: String,
    #[serde(default)]
    pub is_required: bool,
}

/// A bookable service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub default_duration: Option<String>,
    #[serde(default)]
    pub default_price: Option<f64>,
    #[serde(default)]
    pub default_price_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_hidden_from_customers: bool,
    #[serde(default)]
    pub pre_buffer: Option<String>,
    #[serde(default)]
    pub post_buffer: Option<String>,
    /// Staff eligible to perform this service, in provider order
    #[serde(default)]
    pub staff_member_ids: Vec<String>,
    #[serde(default)]
    pub scheduling_policy: Option<SchedulingPolicy>,
    #[serde(default)]
    pub custom_questions: Vec<ServiceQuestion>,
}

impl Service {
    /// Booking length. A missing `defaultDuration` means 15 minutes; one that is
    /// present but unparsable means zero, which yields no slots.
    pub fn duration(&self) -> IsoDuration {
        let raw = self
            .default_duration
            .as_deref()
            .unwrap_or(DEFAULT_SERVICE_DURATION);
        IsoDuration::parse_or(Some(raw), ZERO_MINUTES)
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().as_minutes()
    }

    pub fn minimum_lead_time(&self) -> Option<&str> {
        self.scheduling_policy
            .as_ref()
            .and_then(|p| p.minimum_lead_time.as_deref())
    }

    pub fn maximum_advance(&self) -> Option<&str> {
        self.scheduling_policy
            .as_ref()
            .and_then(|p| p.maximum_advance.as_deref())
    }

    /// The business questions this service asks, in the service's order
    pub fn questions_from(&self, all: &[CustomQuestion]) -> Vec<CustomQuestion> {
        self.custom_questions
            .iter()
            .filter_map(|q| all.iter().find(|c| c.id == q.question_id).cloned())
            .collect()
    }

    pub fn required_question_ids(&self) -> impl Iterator<Item = &str> {
        self.custom_questions
            .iter()
            .filter(|q| q.is_required)
            .map(|q| q.question_id.as_str())
    }

    /// Customer-facing price text
    pub fn price_label(&self) -> String {
        let price = match self.default_price {
            Some(p) => p,
            None => return "Price on request".to_string(),
        };
        match self.default_price_type.as_deref() {
            Some("fixedPrice") => format!("${:.2}", price),
            Some("startingAt") => format!("From ${:.2}", price),
            Some("priceVaries") => "Price varies".to_string(),
            Some("free") => "Free".to_string(),
            _ if price > 0.0 => format!("${:.2}", price),
            _ => "Free".to_string(),
        }
    }
}

/// Pick a service by id or display name (case-insensitive), falling back to
/// the first visible one
pub fn select_service<'a>(services: &'a [Service], name_or_id: Option<&str>) -> Option<&'a Service> {
    let visible = || services.iter().filter(|s| !s.is_hidden_from_customers);
    name_or_id
        .and_then(|key| visible().find(|s| s.id == key || s.display_name.eq_ignore_ascii_case(key)))
        .or_else(|| visible().next())
}

/// A custom question defined on the business
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomQuestion {
    pub id: String,
    pub display_name: String,
    /// "text", "radioButton", ...
    pub answer_input_type: String,
    #[serde(default)]
    pub answer_options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(name: &str) -> Service {
        serde_json::from_value(serde_json::json!({
            "id": format!("svc-{}", name.to_lowercase()),
            "displayName": name,
            "defaultDuration": "PT30M",
            "staffMemberIds": ["staff-1"]
        }))
        .unwrap()
    }

    #[test]
    fn test_duration_defaults() {
        let mut svc = service("Repair");
        assert_eq!(svc.duration_minutes(), 30);

        svc.default_duration = None;
        assert_eq!(svc.duration_minutes(), 15);

        svc.default_duration = Some("half an hour".to_string());
        assert_eq!(svc.duration_minutes(), 0);

        svc.default_duration = Some("PT1H".to_string());
        assert_eq!(svc.duration_minutes(), 60);
    }

    #[test]
    fn test_select_service() {
        let mut hidden = service("Secret");
        hidden.is_hidden_from_customers = true;
        let services = vec![hidden, service("Repair"), service("Estimate")];

        assert_eq!(select_service(&services, Some("estimate")).unwrap().display_name, "Estimate");
        assert_eq!(select_service(&services, Some("svc-estimate")).unwrap().display_name, "Estimate");
        assert_eq!(select_service(&services, Some("missing")).unwrap().display_name, "Repair");
        assert_eq!(select_service(&services, None).unwrap().display_name, "Repair");
        assert_eq!(select_service(&services, Some("secret")).unwrap().display_name, "Repair");
        assert!(select_service(&[], None).is_none());
    }

    #[test]
    fn test_questions_follow_service_order() {
        let mut svc = service("Repair");
        svc.custom_questions = vec![
            ServiceQuestion { question_id: "q-2".to_string(), is_required: true },
            ServiceQuestion { question_id: "q-gone".to_string(), is_required: false },
            ServiceQuestion { question_id: "q-1".to_string(), is_required: false },
        ];
        let all: Vec<CustomQuestion> = ["q-1", "q-2", "q-3"]
            .iter()
            .map(|id| CustomQuestion {
                id: id.to_string(),
                display_name: id.to_uppercase(),
                answer_input_type: "text".to_string(),
                answer_options: Vec::new(),
            })
            .collect();

        let ids: Vec<String> = svc.questions_from(&all).into_iter().map(|q| q.id).collect();
        assert_eq!(ids, vec!["q-2", "q-1"]);
        assert_eq!(svc.required_question_ids().collect::<Vec<_>>(), vec!["q-2"]);
    }

    #[test]
    fn test_price_label() {
        let mut svc = service("Repair");
        assert_eq!(svc.price_label(), "Price on request");

        svc.default_price = Some(40.0);
        svc.default_price_type = Some("startingAt".to_string());
        assert_eq!(svc.price_label(), "From $40.00");

        svc.default_price_type = Some("notSet".to_string());
        assert_eq!(svc.price_label(), "$40.00");

        svc.default_price = Some(0.0);
        assert_eq!(svc.price_label(), "Free");
    }
}
