//! Demo conversation history for three customers.

use chrono::{DateTime, NaiveDate, Utc};

use super::types::{ConversationTurn, CustomerContext, Preferences, Sentiment, TurnContext};

pub struct SampleCustomer {
    pub customer_id: &'static str,
    pub turns: Vec<ConversationTurn>,
    pub context: CustomerContext,
}

fn at(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2024, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn turn(date: DateTime<Utc>, user: &str, ai: &str, context: TurnContext) -> ConversationTurn {
    ConversationTurn {
        timestamp: date,
        user_message: user.to_string(),
        ai_response: ai.to_string(),
        context,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn context(
    last_call: DateTime<Utc>,
    topics: &[&str],
    concerns: &[&str],
    upcoming_visit: Option<DateTime<Utc>>,
    (call_time, language, style): (&str, &str, &str),
) -> CustomerContext {
    CustomerContext {
        last_call_date: Some(last_call),
        topics_discussed: strings(topics),
        concerns: strings(concerns),
        upcoming_visit,
        preferences: Preferences {
            call_time: Some(call_time.to_string()),
            language: Some(language.to_string()),
            communication_style: Some(style.to_string()),
            ..Preferences::default()
        },
        ..CustomerContext::skeleton(Utc::now())
    }
}

pub fn sample_customers() -> Vec<SampleCustomer> {
    vec![
        SampleCustomer {
            customer_id: "CUST001",
            turns: vec![
                turn(
                    at(11, 1, 10, 30),
                    "Hello, kya update hai?",
                    "Namaste Rajesh ji! Aaj ka update bahut accha hai. Ground floor ka slab work complete ho gaya hai. 65% progress ho gayi hai overall.",
                    TurnContext::new("construction_progress", Sentiment::Positive),
                ),
                turn(
                    at(11, 2, 11, 0),
                    "Bathroom tiles ka kya scene hai?",
                    "Bathroom tiles ke liye aapne jo Italian marble select kiya tha, wo aa gaya hai site pe. Quality bahut acchi hai. Next week installation start hoga.",
                    TurnContext::new("bathroom_tiles", Sentiment::Inquiry)
                        .with_concerns(&["tile_quality"])
                        .with_next_steps(&["tile_installation_next_week"]),
                ),
                turn(
                    at(11, 3, 10, 15),
                    "When can I visit the site?",
                    "Aap is weekend visit kar sakte hain. Saturday morning 10 baje best time hai. Main site engineer ko inform kar dungi.",
                    TurnContext::new("site_visit", Sentiment::Positive)
                        .with_next_steps(&["weekend_site_visit_planned"]),
                ),
                turn(
                    at(11, 4, 9, 45),
                    "Plumbing work kaisa chal raha hai?",
                    "Plumbing work bilkul schedule pe hai. Hot water pipes install ho gaye hain. Quality check bhi pass ho gaya.",
                    TurnContext::new("plumbing_work", Sentiment::Positive),
                ),
            ],
            context: context(
                at(11, 4, 9, 45),
                &["construction_progress", "bathroom_tiles", "site_visit", "plumbing_work"],
                &["bathroom_tiles"],
                Some(at(11, 9, 10, 0)),
                ("morning", "more_hindi", "detailed"),
            ),
        },
        SampleCustomer {
            customer_id: "CUST002",
            turns: vec![
                turn(
                    at(11, 1, 16, 30),
                    "Hi Priya, garden ka kya update hai?",
                    "Hello Amit Sir! Garden area mein landscaping ka kaam start ho gaya hai. Grass lagane ka kaam next week hoga.",
                    TurnContext::new("garden_landscaping", Sentiment::Positive)
                        .with_next_steps(&["grass_installation_next_week"]),
                ),
                turn(
                    at(11, 2, 17, 0),
                    "Kids play area ready hai?",
                    "Yes! Play area almost ready hai. Swings aur slides install ho gaye hain. Safety flooring ka kaam chal raha hai.",
                    TurnContext::new("play_area", Sentiment::Excited)
                        .with_next_steps(&["safety_flooring_in_progress"]),
                ),
                turn(
                    at(11, 3, 16, 45),
                    "Diwali pe site visit kar sakte hain?",
                    "Bilkul! Diwali pe special arrangement hai. Pooja bhi hogi site pe. Aap family ke saath aaiye.",
                    TurnContext::new("diwali_visit", Sentiment::Positive)
                        .with_next_steps(&["diwali_site_visit_confirmed"]),
                ),
            ],
            context: context(
                at(11, 3, 16, 45),
                &["garden_landscaping", "play_area", "diwali_visit"],
                &[],
                Some(at(11, 12, 11, 0)),
                ("evening", "balanced_hinglish", "casual"),
            ),
        },
        SampleCustomer {
            customer_id: "CUST003",
            turns: vec![
                turn(
                    at(11, 1, 14, 0),
                    "Next payment kab hai?",
                    "Next installment 15th November ko due hai. Amount Rs. 5 lakhs hai. Online payment ka option available hai.",
                    TurnContext::new("payment_schedule", Sentiment::Neutral)
                        .with_concerns(&["payment_due"])
                        .with_next_steps(&["payment_by_15th_november"]),
                ),
                turn(
                    at(11, 2, 14, 30),
                    "Interior work ka budget kya hoga?",
                    "Interior work ke liye estimated budget Rs. 8-10 lakhs hai for your flat size. Interior designer se meeting arrange kar sakti hoon.",
                    TurnContext::new("interior_budget", Sentiment::Concerned)
                        .with_concerns(&["interior_cost"])
                        .with_next_steps(&["interior_designer_meeting"]),
                ),
                turn(
                    at(11, 3, 13, 45),
                    "Can I get payment extension?",
                    "Yes, extension possible hai. 7 days ka grace period automatically hai. Zyada extension chahiye toh finance team se baat karni hogi.",
                    TurnContext::new("payment_extension", Sentiment::Concerned)
                        .with_concerns(&["payment_flexibility"])
                        .with_next_steps(&["finance_team_discussion"]),
                ),
            ],
            context: context(
                at(11, 3, 13, 45),
                &["payment_schedule", "interior_budget", "payment_extension"],
                &["interior_cost", "payment_flexibility"],
                None,
                ("afternoon", "more_english", "concise"),
            ),
        },
    ]
}
