use super::*;

#[test]
fn drawing_tools_map_to_kinds() {
    assert_eq!(Tool::Pen.draws(), Some(ElementKind::Pen));
    assert_eq!(Tool::Star.draws(), Some(ElementKind::Star));
    assert_eq!(Tool::Select.draws(), None);
    assert_eq!(Tool::Sticky.draws(), None);
    assert_eq!(Tool::Text.draws(), None);
}

#[test]
fn tool_names_parse() {
    assert_eq!(Tool::from_name("highlighter"), Some(Tool::Highlighter));
    assert_eq!(Tool::from_name("octagon"), Some(Tool::Octagon));
    assert_eq!(Tool::from_name("lasso"), None);
}

#[test]
fn tool_name_parses_back() {
    for tool in [Tool::Select, Tool::Pen, Tool::Line, Tool::Star, Tool::Sticky, Tool::Text] {
        assert_eq!(Tool::from_name(tool.name()), Some(tool));
    }
}

#[test]
fn tool_default_is_select() {
    assert_eq!(Tool::default(), Tool::Select);
}

#[test]
fn command_modifier_accepts_ctrl_or_meta() {
    assert!(Modifiers { ctrl: true, ..Modifiers::default() }.command());
    assert!(Modifiers { meta: true, ..Modifiers::default() }.command());
    assert!(!Modifiers { shift: true, ..Modifiers::default() }.command());
}

#[test]
fn key_comparison_ignores_case() {
    assert!(Key("Z".into()).is("z"));
    assert!(!Key("y".into()).is("z"));
}

#[test]
fn input_state_default_is_idle() {
    let state = InputState::default();
    assert!(state.is_idle());
    assert!(state.in_progress().is_none());
}
