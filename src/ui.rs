//! Terminal playground.
//!
//! Renders the simulated feed as a scrollable wall of cards and routes
//! keyboard, mouse, and timer events into the selection machine, so the
//! whole navigation engine can be exercised without a browser. One logical
//! thread services everything; timed effects come back through the task
//! queue, never through background threads.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags, MouseButton,
    MouseEvent, MouseEventKind, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use crate::config::Settings;
use crate::feed::{CardShape, Feed};
use crate::geometry;
use crate::highlight::{self, HighlightStyle, Rgb, PRESET_COLORS};
use crate::page::Page;
use crate::scroll::{tuning, ScrollController, ScrollDirection};
use crate::selection::{Effect, SelectionMachine};
use crate::settings::Store;
use crate::timers::{TaskKind, TaskQueue};

/// One terminal row covers this many virtual page units.
const PX_PER_ROW: f64 = 20.0;
/// Page units per wheel notch.
const WHEEL_STEP: f64 = 60.0;

const COLOR_BG: Color = Color::Rgb(24, 24, 32);
const COLOR_CARD_BG: Color = Color::Rgb(32, 33, 44);
const COLOR_BORDER_IDLE: Color = Color::Rgb(58, 60, 78);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(214, 219, 235);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(140, 146, 168);
const COLOR_ACCENT: Color = Color::Rgb(212, 168, 83);
const COLOR_BADGE_BG: Color = Color::Rgb(58, 60, 78);
const COLOR_STATUS_BG: Color = Color::Rgb(32, 33, 44);

const KEY_HINTS: &str = "1-9 select · Esc Esc home · j/k scroll · m settings · q quit";

pub struct Options {
    pub settings: Arc<Store>,
    pub feed: Feed,
    pub config_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum MenuField {
    #[default]
    DoubleEsc,
    NumberKeys,
    ScrollKeys,
    Badges,
    Style,
    Color,
    CustomColor,
    Close,
}

impl MenuField {
    const ORDER: [MenuField; 8] = [
        MenuField::DoubleEsc,
        MenuField::NumberKeys,
        MenuField::ScrollKeys,
        MenuField::Badges,
        MenuField::Style,
        MenuField::Color,
        MenuField::CustomColor,
        MenuField::Close,
    ];

    fn next(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    fn previous(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

#[derive(Default)]
struct MenuForm {
    active: MenuField,
    custom_color: String,
    status: Option<String>,
}

impl MenuForm {
    fn insert_char(&mut self, ch: char) {
        if self.custom_color.len() < 7 && (ch == '#' || ch.is_ascii_hexdigit()) {
            self.custom_color.push(ch);
        }
        self.status = None;
    }

    fn backspace(&mut self) {
        self.custom_color.pop();
        self.status = None;
    }
}

pub struct Model {
    settings_store: Arc<Store>,
    settings: Settings,
    settings_rx: Receiver<Settings>,
    feed: Feed,
    machine: SelectionMachine,
    tasks: TaskQueue,
    scroll: ScrollController,
    status_message: String,
    config_path: String,
    needs_redraw: bool,
    menu_visible: bool,
    menu_form: MenuForm,
    keyboard_enhanced: bool,
    started: Instant,
    /// Feed area and horizontal scale from the last draw, for mapping mouse
    /// cells back to page coordinates.
    feed_area: Rect,
    px_per_col: f64,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let settings = opts.settings.snapshot();
        let settings_rx = opts.settings.subscribe();
        let mut model = Self {
            settings_store: opts.settings,
            settings,
            settings_rx,
            feed: opts.feed,
            machine: SelectionMachine::new(),
            tasks: TaskQueue::new(),
            scroll: ScrollController::new(),
            status_message: format!("Ready · {KEY_HINTS}"),
            config_path: opts.config_path,
            needs_redraw: true,
            menu_visible: false,
            menu_form: MenuForm::default(),
            keyboard_enhanced: false,
            started: Instant::now(),
            feed_area: Rect::default(),
            px_per_col: 1.0,
        };
        // Initial badge render.
        model.machine.apply_settings(&mut model.feed, &model.settings);
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        stdout.execute(EnableFocusChange)?;

        // Hold-to-scroll needs key release reports, which only terminals
        // speaking the kitty keyboard protocol deliver.
        self.keyboard_enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if self.keyboard_enhanced {
            stdout.execute(PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::REPORT_EVENT_TYPES,
            ))?;
        }

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        if self.keyboard_enhanced {
            let _ = terminal.backend_mut().execute(PopKeyboardEnhancementFlags);
        }
        let _ = terminal.backend_mut().execute(DisableFocusChange);
        let _ = terminal.backend_mut().execute(DisableMouseCapture);
        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            let now = Instant::now();
            self.poll_settings();
            self.pump_feed_signals(now);
            self.run_due_tasks(now);

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            if event::poll(self.poll_timeout(now))? {
                match event::read()? {
                    Event::Key(key) => match key.kind {
                        KeyEventKind::Press | KeyEventKind::Repeat => {
                            match self.handle_key(key) {
                                Ok(true) => break,
                                Ok(false) => {}
                                Err(err) => {
                                    self.status_message = format!("Error: {err}");
                                    self.mark_dirty();
                                }
                            }
                        }
                        KeyEventKind::Release => self.handle_key_release(key.code),
                    },
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(..) => self.mark_dirty(),
                    Event::FocusLost => self.scroll.blur(),
                    _ => {}
                }
            }

            self.advance_animations(Instant::now());
        }

        Ok(())
    }

    /// Sleep until the next timer deadline, but keep a frame cadence while
    /// anything is animating.
    fn poll_timeout(&self, now: Instant) -> Duration {
        let animating = self.scroll.is_active()
            || self.machine.is_fading()
            || (self.machine.armed().is_some()
                && self.settings.highlight_style == HighlightStyle::Glow);
        let mut timeout = if animating {
            Duration::from_millis(33)
        } else {
            Duration::from_millis(250)
        };
        if let Some(deadline) = self.tasks.next_deadline() {
            timeout = timeout.min(deadline.saturating_duration_since(now));
        }
        timeout
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn poll_settings(&mut self) {
        let mut changed = false;
        while let Ok(snapshot) = self.settings_rx.try_recv() {
            self.settings = snapshot;
            changed = true;
        }
        if changed {
            self.machine.apply_settings(&mut self.feed, &self.settings);
            self.mark_dirty();
        }
    }

    /// Raw scroll movement and feed growth become debounced settle signals.
    fn pump_feed_signals(&mut self, now: Instant) {
        if self.feed.take_scroll() {
            self.tasks.schedule(
                TaskKind::ScrollSettle,
                now + Duration::from_millis(tuning::SCROLL_SETTLE_MS),
            );
            self.mark_dirty();
        }
        if self.feed.take_mutation() {
            self.tasks.schedule(
                TaskKind::MutationSettle,
                now + Duration::from_millis(tuning::MUTATION_SETTLE_MS),
            );
            self.mark_dirty();
        }
        if let Some(notice) = self.feed.take_notice() {
            self.status_message = notice;
            self.mark_dirty();
        }
    }

    fn run_due_tasks(&mut self, now: Instant) {
        for kind in self.tasks.take_due(now) {
            let effect =
                self.machine
                    .handle_task(kind, &mut self.feed, &mut self.tasks, &self.settings);
            self.apply_effect(effect);
            self.mark_dirty();
        }
    }

    fn advance_animations(&mut self, now: Instant) {
        if let Some(delta) = self.scroll.tick(now) {
            self.feed.scroll_by(delta);
            self.mark_dirty();
        }
        if self.machine.is_fading() {
            self.machine.tick(&mut self.feed, now);
            self.mark_dirty();
        }
        if self.machine.armed().is_some() && self.settings.highlight_style == HighlightStyle::Glow
        {
            self.mark_dirty();
        }
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::Armed { index } => {
                let digit = index + 1;
                self.status_message =
                    format!("Video {digit} armed · press {digit} again to open, Esc to clear");
                self.mark_dirty();
            }
            Effect::Opened { index } => {
                self.status_message = format!("Opening video {}…", index + 1);
                self.mark_dirty();
            }
            Effect::WentHome => {
                self.status_message = "Going home.".to_string();
                self.mark_dirty();
            }
            Effect::Cleared => {
                self.status_message = "Selection cleared.".to_string();
                self.mark_dirty();
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(true);
        }
        // Modifier chords belong to the terminal, not to us.
        if key.modifiers.intersects(
            KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER | KeyModifiers::META,
        ) {
            return Ok(false);
        }

        if self.menu_visible {
            self.handle_menu_key(key.code);
            return Ok(false);
        }

        let now = Instant::now();
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('m') => {
                self.open_menu();
            }
            KeyCode::Esc => {
                let effect = self.machine.handle_escape(
                    &mut self.feed,
                    &mut self.tasks,
                    &self.settings,
                    now,
                );
                self.apply_effect(effect);
                self.mark_dirty();
            }
            KeyCode::Char(ch) if ch.is_ascii_digit() && ch != '0' => {
                let effect = self.machine.handle_digit(
                    ch as u8 - b'0',
                    &mut self.feed,
                    &mut self.tasks,
                    &self.settings,
                    now,
                );
                self.apply_effect(effect);
                self.mark_dirty();
            }
            KeyCode::Char('j') | KeyCode::Down => self.scroll_key(ScrollDirection::Down, now),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_key(ScrollDirection::Up, now),
            _ => {}
        }
        Ok(false)
    }

    fn handle_key_release(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('j') | KeyCode::Down => self.scroll.release(ScrollDirection::Down),
            KeyCode::Char('k') | KeyCode::Up => self.scroll.release(ScrollDirection::Up),
            _ => {}
        }
    }

    fn scroll_key(&mut self, direction: ScrollDirection, now: Instant) {
        if !self.settings.enable_scroll_keys {
            return;
        }
        self.machine
            .handle_scroll_key(&mut self.feed, &mut self.tasks, &self.settings);
        if self.keyboard_enhanced {
            self.scroll.press(direction, now);
        } else {
            // No release reports: fall back to one viewport hop per press.
            let hop = direction.sign() * self.feed.viewport().height * tuning::TAP_FRACTION;
            self.feed.scroll_by(hop);
        }
        self.mark_dirty();
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.menu_visible {
            return;
        }
        match mouse.kind {
            MouseEventKind::ScrollDown => {
                self.feed.scroll_by(WHEEL_STEP);
                self.mark_dirty();
            }
            MouseEventKind::ScrollUp => {
                self.feed.scroll_by(-WHEEL_STEP);
                self.mark_dirty();
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let Some((x, y)) = self.page_coords(mouse.column, mouse.row) else {
                    return;
                };
                let effect = self.machine.handle_click(
                    x,
                    y,
                    &mut self.feed,
                    &mut self.tasks,
                    &self.settings,
                    Instant::now(),
                );
                self.apply_effect(effect);
            }
            _ => {}
        }
    }

    /// Map a terminal cell inside the feed area to page coordinates.
    fn page_coords(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        let area = self.feed_area;
        if column < area.x || column >= area.right() || row < area.y || row >= area.bottom() {
            return None;
        }
        let x = (column - area.x) as f64 * self.px_per_col;
        let y = (row - area.y) as f64 * PX_PER_ROW;
        Some((x, y))
    }

    fn open_menu(&mut self) {
        self.menu_visible = true;
        self.menu_form = MenuForm::default();
        self.menu_form.custom_color = self.settings.highlight_color.clone();
        self.status_message = "Settings · changes apply immediately".to_string();
        self.mark_dirty();
    }

    fn close_menu(&mut self) {
        self.menu_visible = false;
        self.status_message = format!("Ready · {KEY_HINTS}");
        self.mark_dirty();
    }

    fn handle_menu_key(&mut self, code: KeyCode) {
        let active = self.menu_form.active;
        match code {
            KeyCode::Esc => {
                self.close_menu();
                return;
            }
            KeyCode::Tab | KeyCode::Down => self.menu_form.active = active.next(),
            KeyCode::BackTab | KeyCode::Up => self.menu_form.active = active.previous(),
            KeyCode::Backspace if active == MenuField::CustomColor => self.menu_form.backspace(),
            KeyCode::Left | KeyCode::Right => match active {
                MenuField::Style => self.cycle_style(),
                MenuField::Color => self.cycle_preset(),
                _ => {}
            },
            KeyCode::Enter => self.activate_menu_field(active),
            KeyCode::Char(' ') if active != MenuField::CustomColor => {
                self.activate_menu_field(active)
            }
            KeyCode::Char(ch) if active == MenuField::CustomColor => {
                self.menu_form.insert_char(ch)
            }
            KeyCode::Char('j') => self.menu_form.active = active.next(),
            KeyCode::Char('k') => self.menu_form.active = active.previous(),
            KeyCode::Char('m') | KeyCode::Char('q') => {
                self.close_menu();
                return;
            }
            _ => {}
        }
        self.mark_dirty();
    }

    fn activate_menu_field(&mut self, field: MenuField) {
        match field {
            MenuField::DoubleEsc => {
                self.settings_store
                    .update(|s| s.enable_double_esc = !s.enable_double_esc);
            }
            MenuField::NumberKeys => {
                self.settings_store
                    .update(|s| s.enable_number_keys = !s.enable_number_keys);
            }
            MenuField::ScrollKeys => {
                self.settings_store
                    .update(|s| s.enable_scroll_keys = !s.enable_scroll_keys);
            }
            MenuField::Badges => {
                self.settings_store.update(|s| s.show_badges = !s.show_badges);
            }
            MenuField::Style => self.cycle_style(),
            MenuField::Color => self.cycle_preset(),
            MenuField::CustomColor => {
                let value = self.menu_form.custom_color.trim().to_string();
                if highlight::is_valid_hex(&value) {
                    self.settings_store.update(|s| s.highlight_color = value);
                    self.menu_form.status = Some("Color applied.".to_string());
                } else {
                    self.menu_form.status = Some("Colors look like #rrggbb.".to_string());
                }
            }
            MenuField::Close => self.close_menu(),
        }
    }

    fn cycle_style(&mut self) {
        self.settings_store
            .update(|s| s.highlight_style = s.highlight_style.next());
    }

    fn cycle_preset(&mut self) {
        let current = self.settings.highlight_color.clone();
        let position = PRESET_COLORS
            .iter()
            .position(|(_, value)| value.eq_ignore_ascii_case(&current));
        let next = match position {
            Some(i) => PRESET_COLORS[(i + 1) % PRESET_COLORS.len()].1,
            None => PRESET_COLORS[0].1,
        };
        self.menu_form.custom_color = next.to_string();
        self.settings_store
            .update(|s| s.highlight_color = next.to_string());
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(frame.size());

        frame.render_widget(
            Block::default().style(Style::default().bg(COLOR_BG)),
            chunks[0],
        );

        self.feed_area = chunks[0];
        self.px_per_col = crate::feed::layout::PAGE_WIDTH / chunks[0].width.max(1) as f64;
        self.feed
            .set_viewport_height(chunks[0].height as f64 * PX_PER_ROW);

        self.draw_cards(frame, chunks[0]);
        self.draw_status(frame, chunks[1]);

        if self.menu_visible {
            self.draw_menu(frame, frame.size());
        }
    }

    fn draw_cards(&mut self, frame: &mut Frame<'_>, area: Rect) {
        let px_per_col = self.px_per_col;
        let highlight = self.feed.highlight();
        let glow = highlight::glow_pulse(self.started.elapsed().as_millis() as u64);

        let cards: Vec<_> = self
            .feed
            .visible_cards()
            .into_iter()
            .map(|(card, rect)| (card.clone(), rect))
            .collect();

        for (card, rect) in &cards {
            let Some(cells) = card_cells(rect, area, px_per_col) else {
                continue;
            };

            let mut border_style = Style::default().fg(COLOR_BORDER_IDLE);
            let mut edge: Option<(bool, Color)> = None;
            if let Some((element, spec, opacity)) = highlight {
                if element == card.id {
                    let opacity = match spec.style {
                        HighlightStyle::Glow => opacity * glow,
                        _ => opacity,
                    };
                    let color = blend_toward_bg(spec.color, opacity);
                    match spec.style {
                        HighlightStyle::Solid | HighlightStyle::Glow => {
                            border_style = Style::default().fg(color).add_modifier(Modifier::BOLD);
                        }
                        HighlightStyle::GradientBottom => {
                            border_style = Style::default().fg(color);
                            edge = Some((false, color));
                        }
                        HighlightStyle::GradientTop => {
                            border_style = Style::default().fg(color);
                            edge = Some((true, color));
                        }
                    }
                }
            }

            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .style(Style::default().bg(COLOR_CARD_BG));
            let inner = block.inner(cells);
            frame.render_widget(block, cells);
            self.draw_card_body(frame, inner, card);

            // Edge emphasis for the gradient styles: one solid row along the
            // named edge.
            if let Some((top, color)) = edge {
                let y = if top {
                    cells.y
                } else {
                    cells.bottom().saturating_sub(1)
                };
                let bar = Rect::new(cells.x, y, cells.width, 1);
                frame.render_widget(Block::default().style(Style::default().bg(color)), bar);
            }

            if let Some(badge) = self
                .feed
                .badges()
                .iter()
                .find(|badge| badge.element == card.id)
            {
                let label = format!(" {} ", badge.number);
                let style = if badge.armed {
                    Style::default()
                        .fg(Color::Black)
                        .bg(COLOR_ACCENT)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_BADGE_BG)
                };
                let width = label.width().min(cells.width as usize) as u16;
                if width > 0 && cells.width > 2 {
                    let marker = Rect::new(cells.x + 1, cells.y, width, 1);
                    frame.render_widget(Paragraph::new(label).style(style), marker);
                }
            }
        }
    }

    fn draw_card_body(&self, frame: &mut Frame<'_>, inner: Rect, card: &crate::feed::Card) {
        if inner.width < 4 || inner.height == 0 {
            return;
        }
        let width = inner.width as usize;
        let mut lines: Vec<Line<'static>> = Vec::new();

        let title_rows = match card.shape {
            CardShape::Grid | CardShape::List => 2,
            CardShape::Rail => 1,
        };
        for chunk in wrap(&card.title, width).into_iter().take(title_rows) {
            lines.push(Line::from(Span::styled(
                chunk.into_owned(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )));
        }

        let meta = match card.shape {
            CardShape::Rail => card.duration.clone(),
            _ => format!("{} · {}", card.channel, card.duration),
        };
        lines.push(Line::from(Span::styled(
            truncate_to_width(&meta, width),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));

        lines.truncate(inner.height as usize);
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let hints = format!(" {KEY_HINTS} ");
        let hints_width = hints.width() as u16;
        let message_width = area.width.saturating_sub(hints_width);

        let mut spans = vec![Span::styled(
            truncate_to_width(&format!(" {}", self.status_message), message_width as usize),
            Style::default().fg(COLOR_TEXT_PRIMARY),
        )];
        if area.width > hints_width {
            let used = spans[0].content.width() as u16;
            let pad = area.width.saturating_sub(used + hints_width);
            spans.push(Span::raw(" ".repeat(pad as usize)));
            spans.push(Span::styled(
                hints,
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ));
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(COLOR_STATUS_BG)),
            area,
        );
    }

    fn draw_menu(&self, frame: &mut Frame<'_>, area: Rect) {
        let popup = centered_rect(50, 70, area);
        frame.render_widget(Clear, popup);

        let mut lines: Vec<Line<'static>> = vec![
            self.toggle_line(
                MenuField::DoubleEsc,
                "Double-Esc goes home",
                self.settings.enable_double_esc,
            ),
            self.toggle_line(
                MenuField::NumberKeys,
                "Number keys select videos",
                self.settings.enable_number_keys,
            ),
            self.toggle_line(
                MenuField::ScrollKeys,
                "j/k scroll the feed",
                self.settings.enable_scroll_keys,
            ),
            self.toggle_line(
                MenuField::Badges,
                "Show numbered badges",
                self.settings.show_badges,
            ),
            Line::default(),
            self.value_line(
                MenuField::Style,
                "Highlight style",
                self.settings.highlight_style.label().to_string(),
            ),
            self.value_line(
                MenuField::Color,
                "Highlight color",
                preset_label(&self.settings.highlight_color),
            ),
            self.custom_color_line(),
            Line::default(),
            self.button_line(MenuField::Close, "Close"),
        ];

        if let Some(status) = &self.menu_form.status {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                status.clone(),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Tab/j/k move · Enter apply · Esc close",
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::from(Span::styled(
            format!("Saved to {}", self.config_path),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        )));

        let menu = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Settings",
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_ACCENT))
                    .style(Style::default().bg(COLOR_CARD_BG)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(menu, popup);
    }

    fn field_indicator(&self, field: MenuField) -> Span<'static> {
        if self.menu_form.active == field {
            Span::styled(
                "> ".to_string(),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::raw("  ".to_string())
        }
    }

    fn toggle_line(&self, field: MenuField, label: &str, on: bool) -> Line<'static> {
        Line::from(vec![
            self.field_indicator(field),
            Span::styled(
                if on { "[x] " } else { "[ ] " }.to_string(),
                Style::default().fg(COLOR_ACCENT),
            ),
            Span::styled(label.to_string(), Style::default().fg(COLOR_TEXT_PRIMARY)),
        ])
    }

    fn value_line(&self, field: MenuField, label: &str, value: String) -> Line<'static> {
        Line::from(vec![
            self.field_indicator(field),
            Span::styled(
                format!("{label}: "),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            ),
            Span::styled(value, Style::default().fg(COLOR_ACCENT)),
        ])
    }

    fn custom_color_line(&self) -> Line<'static> {
        let active = self.menu_form.active == MenuField::CustomColor;
        let mut value = self.menu_form.custom_color.clone();
        if active {
            value.push('_');
        }
        Line::from(vec![
            self.field_indicator(MenuField::CustomColor),
            Span::styled(
                "Custom hex: ".to_string(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            ),
            Span::styled(value, Style::default().fg(COLOR_TEXT_SECONDARY)),
        ])
    }

    fn button_line(&self, field: MenuField, label: &str) -> Line<'static> {
        let style = if self.menu_form.active == field {
            Style::default()
                .fg(Color::Black)
                .bg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_PRIMARY)
        };
        Line::from(vec![
            self.field_indicator(field),
            Span::styled(format!("[ {label} ]"), style),
        ])
    }
}

/// Convert a viewport-relative card rect to terminal cells inside `area`,
/// clipped; `None` when nothing of the card lands on screen.
fn card_cells(rect: &geometry::Rect, area: Rect, px_per_col: f64) -> Option<Rect> {
    let x = (rect.x / px_per_col).floor() as i32 + area.x as i32;
    let y = (rect.y / PX_PER_ROW).floor() as i32 + area.y as i32;
    let width = (rect.width / px_per_col).round().max(1.0) as i32;
    let height = (rect.height / PX_PER_ROW).round().max(1.0) as i32;

    let left = x.max(area.x as i32);
    let top = y.max(area.y as i32);
    let right = (x + width).min(area.right() as i32);
    let bottom = (y + height).min(area.bottom() as i32);
    if right <= left || bottom <= top {
        return None;
    }
    Some(Rect::new(
        left as u16,
        top as u16,
        (right - left) as u16,
        (bottom - top) as u16,
    ))
}

/// Dim a highlight color toward the card background as its opacity drops.
fn blend_toward_bg(color: Rgb, opacity: f64) -> Color {
    let opacity = opacity.clamp(0.0, 1.0);
    let (bg_r, bg_g, bg_b) = (32.0, 33.0, 44.0);
    let mix = |c: u8, bg: f64| -> u8 { (bg + (c as f64 - bg) * opacity).round() as u8 };
    Color::Rgb(mix(color.r, bg_r), mix(color.g, bg_g), mix(color.b, bg_b))
}

fn preset_label(color: &str) -> String {
    match PRESET_COLORS
        .iter()
        .find(|(_, value)| value.eq_ignore_ascii_case(color))
    {
        Some((name, value)) => format!("{name} ({value})"),
        None => color.to_string(),
    }
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.to_string().width();
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_cells_maps_and_clips() {
        let area = Rect::new(0, 0, 100, 30);
        // 1000 px across 100 columns: 10 px per column.
        let cells = card_cells(&geometry::Rect::new(100.0, 40.0, 300.0, 180.0), area, 10.0)
            .expect("on screen");
        assert_eq!((cells.x, cells.y), (10, 2));
        assert_eq!((cells.width, cells.height), (30, 9));

        // Half scrolled above the top: clipped to the visible part.
        let clipped = card_cells(&geometry::Rect::new(0.0, -100.0, 300.0, 180.0), area, 10.0)
            .expect("partially on screen");
        assert_eq!(clipped.y, 0);
        assert_eq!(clipped.height, 4);

        assert!(card_cells(&geometry::Rect::new(0.0, 700.0, 300.0, 180.0), area, 10.0).is_none());
    }

    #[test]
    fn blend_reaches_the_endpoints() {
        let gold = Rgb {
            r: 0xd4,
            g: 0xa8,
            b: 0x53,
        };
        assert_eq!(blend_toward_bg(gold, 1.0), Color::Rgb(0xd4, 0xa8, 0x53));
        assert_eq!(blend_toward_bg(gold, 0.0), Color::Rgb(32, 33, 44));
    }

    #[test]
    fn preset_labels_are_named() {
        assert_eq!(preset_label("#d4a853"), "Gold (#d4a853)");
        assert_eq!(preset_label("#123456"), "#123456");
    }

    #[test]
    fn truncation_respects_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        let cut = truncate_to_width("a much longer title", 8);
        assert!(cut.width() <= 8);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn menu_fields_cycle_both_ways() {
        let mut field = MenuField::DoubleEsc;
        for _ in 0..MenuField::ORDER.len() {
            field = field.next();
        }
        assert_eq!(field, MenuField::DoubleEsc);
        assert_eq!(MenuField::DoubleEsc.previous(), MenuField::Close);
    }
}
