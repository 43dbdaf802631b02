//! Localized instruction preambles, apologies, and the declared tool
//! schema. All user-visible fallback text lives here so the orchestrator
//! never hardcodes a language.

use chrono::NaiveDate;

use sky_domain::chat::{Language, ToolDefinition};

/// The single tool declared to the completion provider.
pub fn weather_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_weather".into(),
        description: "Look up current, forecast, or historical weather for a city.".into(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name, e.g. \"Tokyo\" or \"New York\""
                },
                "date": {
                    "type": "string",
                    "description": "\"today\", \"tomorrow\", \"yesterday\", or a YYYY-MM-DD date. Omit for current conditions."
                }
            },
            "required": ["location"]
        }),
    }
}

/// Preamble for the first round trip: anchors relative dates to the
/// current day and pins the response language. `context_hint` is the
/// session digest, passed through verbatim as an in-band hint.
pub fn first_preamble(
    language: Language,
    today: NaiveDate,
    context_hint: Option<&str>,
) -> String {
    let mut preamble = match language {
        Language::En => format!(
            "You are a friendly weather assistant. Today's date is {today}. \
             Resolve relative expressions like \"tomorrow\" or \"yesterday\" against that date, \
             in the current year. When the user asks about weather conditions, call the \
             get_weather tool once per city mentioned. Answer in English."
        ),
        Language::Ja => format!(
            "あなたは親切な天気アシスタントです。今日の日付は{today}です。\
             「明日」「昨日」などの相対的な日付表現はこの日付を基準に解釈してください。\
             天気について聞かれたら、都市ごとにget_weatherツールを呼び出してください。\
             日本語で答えてください。"
        ),
    };
    if let Some(hint) = context_hint {
        match language {
            Language::En => {
                preamble.push_str(&format!(" Known conversation context: {hint}."));
            }
            Language::Ja => {
                preamble.push_str(&format!(" これまでの会話の文脈: {hint}"));
            }
        }
    }
    preamble
}

/// Preamble for the second round trip: pure formatting guidance for the
/// fetched observations.
pub fn formatting_preamble(language: Language, multi_city: bool) -> String {
    match (language, multi_city) {
        (Language::En, false) => "Format the weather data into a short, friendly answer. \
             Mention the temperature and conditions, and add clothing or activity advice \
             when it is useful. Answer in English."
            .into(),
        (Language::En, true) => "Format the weather data into a short, friendly answer \
             comparing the locations. Highlight the differences that matter, and add \
             clothing or activity advice when it is useful. Answer in English."
            .into(),
        (Language::Ja, false) => "取得した天気データを簡潔で親しみやすい日本語の回答にまとめてください。\
             気温と天候に触れ、役立つ場合は服装や活動のアドバイスも添えてください。"
            .into(),
        (Language::Ja, true) => "取得した各都市の天気データを比較しながら、簡潔で親しみやすい日本語の\
             回答にまとめてください。重要な違いに触れ、役立つ場合は服装や活動のアドバイスも添えてください。"
            .into(),
    }
}

/// Terminal apology when a completion round trip fails.
pub fn apology_upstream(language: Language) -> &'static str {
    match language {
        Language::En => "Sorry, something went wrong while preparing your answer. Please try again.",
        Language::Ja => "申し訳ありません。回答の生成中に問題が発生しました。もう一度お試しください。",
    }
}

/// Terminal apology when any weather lookup fails.
pub fn apology_tool(language: Language) -> &'static str {
    match language {
        Language::En => "Sorry, I couldn't retrieve the weather data right now. Please try again.",
        Language::Ja => "申し訳ありません。天気情報を取得できませんでした。もう一度お試しください。",
    }
}

/// Clarifying prompt when no location is known and the query names none.
pub fn clarify_location(language: Language) -> &'static str {
    match language {
        Language::En => "Which city would you like the weather for?",
        Language::Ja => "どの都市の天気をお調べしましょうか？",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_preamble_embeds_today_and_hint() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let p = first_preamble(Language::En, today, Some("location: tokyo, japan"));
        assert!(p.contains("2026-08-08"));
        assert!(p.contains("location: tokyo, japan"));
    }

    #[test]
    fn japanese_preamble_is_japanese() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 8).unwrap();
        let p = first_preamble(Language::Ja, today, None);
        assert!(p.contains("天気"));
        assert!(p.contains("2026-08-08"));
    }

    #[test]
    fn tool_schema_requires_location_only() {
        let tool = weather_tool();
        assert_eq!(tool.name, "get_weather");
        assert_eq!(tool.parameters["required"], serde_json::json!(["location"]));
        assert!(tool.parameters["properties"].get("date").is_some());
    }
}
