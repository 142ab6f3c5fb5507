use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use nexora_core::Provider;

use crate::app::{App, InputMode, Tab};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line editing shared by every text field. Returns false for keys it
/// does not handle.
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(text.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = text.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Redraw => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

pub async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // Any key dismisses a notice
    if app.notice.take().is_some() {
        return Ok(());
    }

    if app.show_api_key_input {
        handle_api_key_input(app, key);
        return Ok(());
    }
    if app.show_attach_input {
        handle_attach_input(app, key);
        return Ok(());
    }
    if app.show_provider_picker {
        handle_provider_picker(app, key);
        return Ok(());
    }
    if app.show_model_picker {
        handle_model_picker(app, key);
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key).await,
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_api_key_input(),
        KeyCode::Enter => app.submit_api_key(),
        _ => {
            edit_line(&mut app.api_key_input, &mut app.api_key_input_cursor, key);
        }
    }
}

fn handle_attach_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_attach_input = false;
            app.attach_input.clear();
            app.attach_input_cursor = 0;
        }
        KeyCode::Enter => app.attach_from_path(),
        _ => {
            edit_line(&mut app.attach_input, &mut app.attach_input_cursor, key);
        }
    }
}

fn handle_provider_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_provider_picker = false;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.provider_picker_nav_down();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.provider_picker_nav_up();
        }
        KeyCode::Enter => {
            if let Some(i) = app.provider_picker_state.selected() {
                if let Some(&provider) = Provider::all().get(i) {
                    app.choose_provider(provider);
                }
            }
        }
        _ => {}
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_model_picker = false;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.model_picker_nav_down();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.model_picker_nav_up();
        }
        KeyCode::Enter => {
            app.select_model();
        }
        _ => {}
    }
}

async fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
        }

        // Tab switching
        KeyCode::Char('1') => app.switch_tab(Tab::Reasoning),
        KeyCode::Char('2') => app.switch_tab(Tab::ImageGen),
        KeyCode::Char('3') => app.switch_tab(Tab::Chat),
        KeyCode::Tab => app.switch_tab(app.tab.next()),
        KeyCode::BackTab => app.switch_tab(app.tab.prev()),

        // Start typing
        KeyCode::Char('i') | KeyCode::Enter => {
            if !app.is_loading(app.tab) {
                app.start_editing();
            }
        }

        // Attachments
        KeyCode::Char('a') => app.open_attach_input(),
        KeyCode::Char('x') => app.remove_attachment(),
        KeyCode::Char('c') => {
            if app.has_camera() {
                app.capture_photo();
            }
        }
        KeyCode::Char('v') => {
            if app.has_voice() {
                app.toggle_voice();
            }
        }

        // Download the generated image
        KeyCode::Char('s') => {
            if app.tab == Tab::ImageGen {
                app.save_generated_image();
            }
        }

        // Chat transcript
        KeyCode::Char('j') | KeyCode::Down => {
            if app.tab == Tab::Chat {
                app.scroll_chat_down();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if app.tab == Tab::Chat {
                app.scroll_chat_up();
            }
        }
        KeyCode::Char('G') => {
            if app.tab == Tab::Chat {
                app.scroll_chat_to_bottom();
            }
        }
        KeyCode::Char(' ') => {
            if app.tab == Tab::Chat {
                app.chat.finish_reveals();
                app.scroll_chat_to_bottom();
            }
        }
        KeyCode::Char('C') => {
            if app.tab == Tab::Chat {
                app.clear_chat();
            }
        }

        // Provider and model pickers
        KeyCode::Char('M') => app.open_model_picker().await,
        KeyCode::Char('P') => app.open_provider_picker(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit();
            if app.is_loading(app.tab) {
                app.input_mode = InputMode::Normal;
            }
        }
        _ => {
            let mut cursor = app.cursor;
            edit_line(app.active_input_mut(), &mut cursor, key);
            app.cursor = cursor;
        }
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if app.tab != Tab::Chat || !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.chat_scroll = app.chat_scroll.saturating_add(3),
        MouseEventKind::ScrollUp => app.chat_scroll = app.chat_scroll.saturating_sub(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexora_core::Config;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app() -> App {
        App::without_backend(Config::new(), Provider::Gemini)
    }

    async fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[test]
    fn char_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("🦊x", 1), 4);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[test]
    fn edit_line_inserts_and_deletes_at_cursor() {
        let mut text = String::from("héllo");
        let mut cursor = 1;
        assert!(edit_line(&mut text, &mut cursor, key(KeyCode::Delete)));
        assert_eq!(text, "hllo");
        assert!(edit_line(&mut text, &mut cursor, key(KeyCode::Char('é'))));
        assert_eq!((text.as_str(), cursor), ("héllo", 2));
        assert!(edit_line(&mut text, &mut cursor, key(KeyCode::Backspace)));
        assert_eq!(text, "hllo");
        assert!(edit_line(&mut text, &mut cursor, key(KeyCode::End)));
        assert_eq!(cursor, 4);
        assert!(!edit_line(&mut text, &mut cursor, key(KeyCode::Tab)));
    }

    #[tokio::test]
    async fn number_keys_switch_tabs() {
        let mut app = test_app();
        handle_key(&mut app, key(KeyCode::Char('3'))).await.unwrap();
        assert_eq!(app.tab, Tab::Chat);
        handle_key(&mut app, key(KeyCode::BackTab)).await.unwrap();
        assert_eq!(app.tab, Tab::ImageGen);
        handle_key(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.tab, Tab::Chat);
    }

    #[tokio::test]
    async fn typing_goes_to_the_active_tab() {
        let mut app = test_app();
        handle_key(&mut app, key(KeyCode::Char('i'))).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Editing);
        type_str(&mut app, "q1").await;
        assert_eq!(app.reasoning.question, "q1");
        // 'q' is text while editing, not quit
        assert!(!app.should_quit);

        handle_key(&mut app, key(KeyCode::Esc)).await.unwrap();
        handle_key(&mut app, key(KeyCode::Char('2'))).await.unwrap();
        handle_key(&mut app, key(KeyCode::Enter)).await.unwrap();
        type_str(&mut app, "fox").await;
        assert_eq!(app.image_gen.prompt, "fox");
        assert_eq!(app.reasoning.question, "q1");
    }

    #[tokio::test]
    async fn empty_submit_stays_in_editing() {
        let mut app = test_app();
        app.start_editing();
        handle_key(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Editing);
        assert!(!app.reasoning.loading);
        assert!(app.reasoning_task.is_none());
    }

    #[tokio::test]
    async fn notice_is_dismissed_by_any_key() {
        let mut app = test_app();
        app.notice = Some(nexora_core::Notice {
            title: "File too large",
            message: "too big".into(),
        });
        handle_key(&mut app, key(KeyCode::Char('3'))).await.unwrap();
        assert!(app.notice.is_none());
        assert_eq!(app.tab, Tab::Reasoning);
    }

    #[tokio::test]
    async fn ctrl_c_and_q_quit() {
        let mut app = test_app();
        handle_key(&mut app, KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
            .await
            .unwrap();
        assert!(app.should_quit);

        let mut app = test_app();
        handle_key(&mut app, key(KeyCode::Char('q'))).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn capture_keys_are_inert_without_capabilities() {
        let mut app = test_app();
        handle_key(&mut app, key(KeyCode::Char('c'))).await.unwrap();
        handle_key(&mut app, key(KeyCode::Char('v'))).await.unwrap();
        assert!(app.camera_task.is_none());
        assert!(!app.is_listening());
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn attach_popup_edits_path() {
        let mut app = test_app();
        handle_key(&mut app, key(KeyCode::Char('a'))).await.unwrap();
        assert!(app.show_attach_input);
        type_str(&mut app, "/tmp/x").await;
        assert_eq!(app.attach_input, "/tmp/x");
        handle_key(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(!app.show_attach_input);
        assert!(app.attach_input.is_empty());
    }
}
