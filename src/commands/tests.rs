use super::*;
use chrono::Utc;

fn conversation(id: &str) -> Conversation {
    let now = Utc::now();
    Conversation {
        id: id.to_string(),
        title: format!("chat {id}"),
        messages: vec![crate::core::message::Message::user("fever")],
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn plain_text_is_sent_as_a_message() {
    assert_eq!(
        process_input("I have a rash"),
        CommandResult::ProcessAsMessage("I have a rash".to_string())
    );
}

#[test]
fn unknown_commands_fall_through_as_messages() {
    assert_eq!(
        process_input("/dosage for ibuprofen"),
        CommandResult::ProcessAsMessage("/dosage for ibuprofen".to_string())
    );
    assert_eq!(
        process_input("/"),
        CommandResult::ProcessAsMessage("/".to_string())
    );
}

#[test]
fn session_commands_map_to_intents() {
    assert_eq!(
        process_input("/retry"),
        CommandResult::Session(Intent::RetryRequested)
    );
    assert_eq!(
        process_input("  /NEW  "),
        CommandResult::Session(Intent::NewConversationRequested)
    );
    assert_eq!(
        process_input("/delete"),
        CommandResult::Session(Intent::DeleteCurrentRequested)
    );
    assert_eq!(
        process_input("/delete 1714550400000"),
        CommandResult::Delete("1714550400000".to_string())
    );
    assert_eq!(process_input("/load 2"), CommandResult::Load("2".to_string()));
    assert!(matches!(process_input("/load"), CommandResult::Usage(_)));
}

#[test]
fn clear_all_needs_confirmation() {
    assert!(matches!(process_input("/clear-all"), CommandResult::Usage(_)));
    assert_eq!(
        process_input("/clear-all confirm"),
        CommandResult::Session(Intent::ClearAllRequested)
    );
}

#[test]
fn export_arguments_are_parsed() {
    assert_eq!(
        process_input("/export json"),
        CommandResult::Export {
            format: ExportFormat::Json,
            target: None,
            path: None,
        }
    );
    assert_eq!(
        process_input("/export txt #3"),
        CommandResult::Export {
            format: ExportFormat::Text,
            target: Some("#3".to_string()),
            path: None,
        }
    );
    assert_eq!(
        process_input("/export html notes.html"),
        CommandResult::Export {
            format: ExportFormat::Html,
            target: None,
            path: Some(PathBuf::from("notes.html")),
        }
    );
    assert_eq!(
        process_input("/export html 1714550400000 notes.html"),
        CommandResult::Export {
            format: ExportFormat::Html,
            target: Some("1714550400000".to_string()),
            path: Some(PathBuf::from("notes.html")),
        }
    );
    assert!(matches!(process_input("/export"), CommandResult::Usage(_)));
    assert!(matches!(process_input("/export pdf"), CommandResult::Usage(_)));
    assert!(matches!(
        process_input("/export json a.json b.json"),
        CommandResult::Usage(_)
    ));
}

#[test]
fn theme_and_disclaimer_arguments() {
    assert_eq!(process_input("/theme"), CommandResult::Theme(None));
    assert_eq!(
        process_input("/theme dark"),
        CommandResult::Theme(Some(Theme::Dark))
    );
    assert!(matches!(process_input("/theme neon"), CommandResult::Usage(_)));
    assert_eq!(process_input("/disclaimer"), CommandResult::Disclaimer(None));
    assert_eq!(
        process_input("/disclaimer hide"),
        CommandResult::Disclaimer(Some(true))
    );
    assert_eq!(
        process_input("/disclaimer SHOW"),
        CommandResult::Disclaimer(Some(false))
    );
}

#[test]
fn aliases_resolve_to_their_command() {
    assert_eq!(process_input("/exit"), CommandResult::Quit);
    assert_eq!(process_input("/history"), CommandResult::List);
    assert_eq!(process_input("/status"), CommandResult::Health);
}

#[test]
fn conversation_refs_accept_ids_and_positions() {
    let conversations = vec![conversation("300"), conversation("200"), conversation("100")];
    assert_eq!(
        resolve_conversation_ref(&conversations, "200"),
        Some("200".to_string())
    );
    assert_eq!(
        resolve_conversation_ref(&conversations, "1"),
        Some("300".to_string())
    );
    assert_eq!(
        resolve_conversation_ref(&conversations, "#3"),
        Some("100".to_string())
    );
    assert_eq!(resolve_conversation_ref(&conversations, "0"), None);
    assert_eq!(resolve_conversation_ref(&conversations, "4"), None);
    assert_eq!(resolve_conversation_ref(&conversations, "abc"), None);
}

#[test]
fn help_lists_every_usage() {
    let help = help_text();
    for command in all_commands() {
        for usage in command.usages {
            assert!(help.contains(usage.syntax), "missing {}", usage.syntax);
        }
    }
}
