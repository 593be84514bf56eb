use crate::{
    client::{
        ActionButtons,
        DappSnapshot,
    },
    format,
};
use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Connect,
    StartLottery,
    EndLottery,
    ConfirmEnter { count: u64 },
    Redraw,
}

#[derive(Debug, Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default)]
enum Mode {
    #[default]
    Normal,
    EnterModal(EnterState),
    QuitModal,
}

#[derive(Clone, Debug)]
struct EnterState {
    count: u64,
}

impl Default for EnterState {
    fn default() -> Self {
        EnterState { count: 1 }
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    // Create a single persistent Terminal to preserve buffers across draws
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub type InputEventReceiver = EventStream;

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(event) => Ok(event?),
        None => Err(eyre!("input event stream closed")),
    }
}

/// Turns a raw terminal event into an app-level event. Returns `None` when
/// the event only changed modal state; the caller redraws either way.
/// Action keys are live only while the matching button is enabled, so a
/// disabled action never reaches the contract.
pub fn interpret_event(
    state: &mut UiState,
    event: Event,
    buttons: ActionButtons,
) -> Option<UserEvent> {
    let key = match event {
        Event::Key(k) if k.kind == KeyEventKind::Press => k,
        Event::Resize(_, _) => return Some(UserEvent::Redraw),
        _ => return None,
    };

    match &mut state.mode {
        Mode::EnterModal(es) => match key.code {
            KeyCode::Esc => {
                state.mode = Mode::Normal;
                None
            }
            KeyCode::Enter => {
                let count = es.count.max(1);
                state.mode = Mode::Normal;
                Some(UserEvent::ConfirmEnter { count })
            }
            KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('+') => {
                es.count = es.count.saturating_add(1);
                None
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('-') => {
                es.count = es.count.saturating_sub(1).max(1);
                None
            }
            KeyCode::Backspace => {
                es.count /= 10;
                None
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let d = c.to_digit(10).unwrap_or_default() as u64;
                es.count = es.count.saturating_mul(10).saturating_add(d);
                None
            }
            _ => None,
        },
        Mode::QuitModal => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                None
            }
            _ => None,
        },
        Mode::Normal => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                state.mode = Mode::QuitModal;
                None
            }
            KeyCode::Char('c') if buttons.connect => Some(UserEvent::Connect),
            KeyCode::Char('s') if buttons.start => Some(UserEvent::StartLottery),
            KeyCode::Char('e') if buttons.enter => {
                state.mode = Mode::EnterModal(EnterState::default());
                None
            }
            KeyCode::Char('d') if buttons.end => Some(UserEvent::EndLottery),
            _ => None,
        },
    }
}

pub fn draw(state: &mut UiState, snap: &DappSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

fn ui(f: &mut Frame, state: &UiState, snap: &DappSnapshot) {
    // Clear the whole frame to avoid leftover fragments
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // account + network
            Constraint::Length(6), // current round
            Constraint::Length(4), // latest results
            Constraint::Min(5),    // status/errors
            Constraint::Length(3), // help
        ])
        .split(f.area());

    draw_account_panel(f, chunks[0], snap);
    draw_round_panel(f, chunks[1], snap);
    draw_results_panel(f, chunks[2], snap);
    draw_status_panel(f, chunks[3], snap);
    draw_help_panel(f, chunks[4], snap);
    draw_modals(f, state, snap);
}

fn draw_account_panel(f: &mut Frame, area: Rect, snap: &DappSnapshot) {
    let account = match &snap.account {
        Some(account) => account.as_str(),
        None => "not connected",
    };
    let balance = match &snap.my_balance {
        Some(balance) => format!(" | Balance: {balance} ETH"),
        None => String::new(),
    };
    let text = format!(
        "Account: {}{} | Chain: {} | Lottery: {}",
        account, balance, snap.chain_id, snap.contract_address
    );
    let widget =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Wallet"));
    f.render_widget(widget, area);
}

fn draw_round_panel(f: &mut Frame, area: Rect, snap: &DappSnapshot) {
    let entries = match snap.my_entries {
        Some(mine) => format!("{} ({} yours)", snap.entry_count, mine),
        None => snap.entry_count.to_string(),
    };
    let lines = vec![
        Line::from(format!(
            "State: {} | Time left: {}",
            snap.phase, snap.countdown
        )),
        Line::from(format!(
            "Prize pool: {} ETH | Entry fee: {} ETH",
            snap.prize_pool, snap.entry_fee
        )),
        Line::from(format!("Entries: {entries}")),
    ];
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Lottery"));
    f.render_widget(widget, area);
}

fn draw_results_panel(f: &mut Frame, area: Rect, snap: &DappSnapshot) {
    let mut lines = Vec::new();
    match &snap.winner {
        Some(winner) => lines.push(Line::from(format!("Latest winner: {winner}"))),
        None => lines.push(Line::styled(
            "No winner drawn yet",
            Style::default().fg(Color::DarkGray),
        )),
    }
    if let Some(randomness) = &snap.randomness {
        lines.push(Line::from(format!("Randomness: {randomness}")));
    }
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Results"));
    f.render_widget(widget, area);
}

fn draw_status_panel(f: &mut Frame, area: Rect, snap: &DappSnapshot) {
    let widget = if snap.errors.is_empty() {
        let mut lines: Vec<Line> = Vec::new();
        if snap.status.trim().is_empty() {
            lines.push(Line::from("Ready"));
        } else {
            for line in snap.status.lines() {
                lines.push(Line::from(line.to_string()));
            }
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines: Vec<Line> = snap.errors.iter().map(|e| Line::from(e.clone())).collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(widget, area);
}

fn draw_help_panel(f: &mut Frame, area: Rect, snap: &DappSnapshot) {
    let mut parts = Vec::new();
    if snap.buttons.connect {
        parts.push("c connect");
    }
    if snap.buttons.start {
        parts.push("s start");
    }
    if snap.buttons.enter {
        parts.push("e enter");
    }
    if snap.buttons.end {
        parts.push("d end & draw");
    }
    parts.push("q/Esc quit");
    let help = Paragraph::new(parts.join(" | "))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &DappSnapshot) {
    match &state.mode {
        Mode::EnterModal(es) => {
            let area = centered_rect(50, 30, f.area());
            let block = Block::default().borders(Borders::ALL).title("Buy Entries");
            let price = match format::entry_cost(es.count, snap.entry_fee_wei) {
                Ok(cost) => format!("{} ETH", format::format_ether_short(cost)),
                Err(_) => String::from("too many entries"),
            };
            let lines = vec![
                Line::from(format!("Entries: {}", es.count)),
                Line::from(format!("Total price: {price}")),
                Line::from("Enter=confirm, Esc=cancel, +/- change, digits type"),
            ];
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(Paragraph::new(lines), block.inner(area));
        }
        Mode::QuitModal => {
            let area = centered_rect(40, 20, f.area());
            let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
            let p = Paragraph::new("Quit the lottery client? (Y/N)");
            f.render_widget(Clear, area);
            f.render_widget(block.clone(), area);
            f.render_widget(p, block.inner(area));
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1]);

    vertical[1]
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crossterm::event::{
        KeyEvent,
        KeyModifiers,
    };

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn all_enabled() -> ActionButtons {
        ActionButtons {
            connect: true,
            start: true,
            enter: true,
            end: true,
        }
    }

    #[test]
    fn interpret_event__enabled_keys_map_to_actions() {
        let mut state = UiState::default();

        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Char('c')), all_enabled()),
            Some(UserEvent::Connect)
        );
        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Char('s')), all_enabled()),
            Some(UserEvent::StartLottery)
        );
        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Char('d')), all_enabled()),
            Some(UserEvent::EndLottery)
        );
    }

    #[test]
    fn interpret_event__disabled_action_keys_stay_dead() {
        // given every button disabled (e.g. a Processing round)
        let mut state = UiState::default();
        let buttons = ActionButtons::default();

        // when / then: no action fires and no modal opens
        for key in ['c', 's', 'e', 'd'] {
            assert_eq!(
                interpret_event(&mut state, press(KeyCode::Char(key)), buttons),
                None
            );
        }
        assert!(matches!(state.mode, Mode::Normal));
        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Enter), buttons),
            None
        );
    }

    #[test]
    fn interpret_event__enter_modal_builds_a_count_and_confirms() {
        // given the entry modal is open
        let mut state = UiState::default();
        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Char('e')), all_enabled()),
            None
        );

        // when: type 12, then confirm
        for key in [KeyCode::Backspace, KeyCode::Char('1'), KeyCode::Char('2')] {
            assert_eq!(interpret_event(&mut state, press(key), all_enabled()), None);
        }
        let confirmed = interpret_event(&mut state, press(KeyCode::Enter), all_enabled());

        // then
        assert_eq!(confirmed, Some(UserEvent::ConfirmEnter { count: 12 }));
        assert!(matches!(state.mode, Mode::Normal));
    }

    #[test]
    fn interpret_event__enter_modal_count_never_drops_below_one() {
        let mut state = UiState::default();
        interpret_event(&mut state, press(KeyCode::Char('e')), all_enabled());

        interpret_event(&mut state, press(KeyCode::Char('-')), all_enabled());
        interpret_event(&mut state, press(KeyCode::Char('-')), all_enabled());
        let confirmed = interpret_event(&mut state, press(KeyCode::Enter), all_enabled());

        assert_eq!(confirmed, Some(UserEvent::ConfirmEnter { count: 1 }));
    }

    #[test]
    fn interpret_event__escape_cancels_the_enter_modal_without_an_event() {
        let mut state = UiState::default();
        interpret_event(&mut state, press(KeyCode::Char('e')), all_enabled());

        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Esc), all_enabled()),
            None
        );
        assert!(matches!(state.mode, Mode::Normal));
    }

    #[test]
    fn interpret_event__quit_goes_through_a_confirmation_modal() {
        let mut state = UiState::default();

        // q opens the modal, n backs out, q + y quits
        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Char('q')), all_enabled()),
            None
        );
        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Char('n')), all_enabled()),
            None
        );
        assert!(matches!(state.mode, Mode::Normal));
        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Char('q')), all_enabled()),
            None
        );
        assert_eq!(
            interpret_event(&mut state, press(KeyCode::Char('y')), all_enabled()),
            Some(UserEvent::Quit)
        );
    }

    #[test]
    fn interpret_event__key_release_is_ignored() {
        let mut state = UiState::default();
        let mut release = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;

        assert_eq!(
            interpret_event(&mut state, Event::Key(release), all_enabled()),
            None
        );
    }
}
