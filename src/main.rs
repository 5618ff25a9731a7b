use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::{
    io::{self, stdout},
    time::{Duration, Instant},
};

use blockfall::game::{Cell, Game, GameEvent, Shape, ShapeKind, FIELD_HEIGHT, FIELD_WIDTH};

// ============================================================================
// Host Constants
// ============================================================================

// The engine owns no timer; the host delivers ticks at this interval.
const TICK_MS: u64 = 200;
const POINTS_PER_ROW: u32 = 100;

const CELL_WIDTH: u16 = 2;
const BLOCK_CHAR: &str = "██";
const EMPTY_CHAR: &str = "  ";

// ============================================================================
// Color Mapping
// ============================================================================

fn shape_color(kind: ShapeKind) -> Color {
    match kind {
        ShapeKind::Square => Color::LightBlue,
        ShapeKind::Stick => Color::Magenta,
        ShapeKind::Boat => Color::Green,
        ShapeKind::LeftL => Color::Yellow,
        ShapeKind::RightL => Color::Rgb(255, 165, 0),
        ShapeKind::LeftS => Color::Rgb(255, 105, 180),
        ShapeKind::RightS => Color::Cyan,
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, game: &Game, score: u32, rows_cleared: u32, paused: bool) {
    let area = frame.size();

    render_game(frame, game, score, rows_cleared, area);

    if game.is_game_over() {
        render_game_over(frame, score, rows_cleared, area);
    } else if paused {
        render_paused(frame, area);
    }
}

fn render_game(frame: &mut Frame, game: &Game, score: u32, rows_cleared: u32, area: Rect) {
    // Calculate dimensions
    let grid_display_width = (FIELD_WIDTH as u16 * CELL_WIDTH) + 2;
    let grid_display_height = FIELD_HEIGHT as u16 + 2;
    let preview_width = 12;
    let info_width = 14;
    let total_width = grid_display_width + preview_width + info_width + 4;
    let total_height = grid_display_height + 3;

    // Center everything
    let main_area = centered_rect(total_width, total_height, area);

    // Split vertically first: game area and controls
    let vertical = Layout::vertical([
        Constraint::Length(grid_display_height),
        Constraint::Fill(1),
    ])
    .split(main_area);

    let game_row = vertical[0];

    // Layout: [Field][Preview][Info]
    let horizontal = Layout::horizontal([
        Constraint::Length(grid_display_width),
        Constraint::Length(preview_width),
        Constraint::Length(info_width),
    ])
    .split(game_row);

    render_field(frame, game, horizontal[0]);
    render_preview(frame, game, horizontal[1]);
    render_info(frame, score, rows_cleared, horizontal[2]);

    // Render controls hint below
    let controls_area = Rect {
        x: area.x,
        y: game_row.y + game_row.height,
        width: area.width,
        height: 2,
    };

    if controls_area.y + 1 < area.height {
        let controls = Paragraph::new(vec![Line::from(
            "←→: Move | ↑/Space: Rotate | ↓: Drop | P: Pause | R: Restart | Q/ESC: Quit",
        )])
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(controls, controls_area);
    }
}

fn render_field(frame: &mut Frame, game: &Game, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Blockfall ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // The engine supplies the complete visual grid: settled stack at the
    // bottom, falling piece overlaid.
    let visual_grid = game.render_grid();

    let mut lines: Vec<Line> = Vec::new();

    for grid_row in &visual_grid {
        let mut spans: Vec<Span> = Vec::new();

        for cell in grid_row {
            let (symbol, style) = match cell {
                Cell::Empty => (EMPTY_CHAR, Style::default()),
                Cell::Filled(kind) => (BLOCK_CHAR, Style::default().fg(shape_color(*kind))),
            };

            spans.push(Span::styled(symbol, style));
        }

        lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, inner);
}

fn render_preview(frame: &mut Frame, game: &Game, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Next ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let shape = Shape::canonical(game.snapshot().next_shape);
    let color = shape_color(shape.kind);

    let mut lines: Vec<Line> = vec![Line::from("")];

    for row in 0..shape.height {
        let mut spans: Vec<Span> = Vec::new();
        spans.push(Span::raw(" "));

        for col in 0..shape.width {
            if shape.cells.contains(&(col, row)) {
                spans.push(Span::styled(BLOCK_CHAR, Style::default().fg(color)));
            } else {
                spans.push(Span::raw(EMPTY_CHAR));
            }
        }

        lines.push(Line::from(spans));
    }

    let paragraph = Paragraph::new(lines);
    frame.render_widget(paragraph, inner);
}

fn render_info(frame: &mut Frame, score: u32, rows_cleared: u32, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Info ")
        .title_alignment(Alignment::Center);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("Score", Style::default().fg(Color::Yellow))),
        Line::from(format!("{}", score)),
        Line::from(""),
        Line::from(Span::styled("Rows", Style::default().fg(Color::Cyan))),
        Line::from(format!("{}", rows_cleared)),
    ];

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

fn render_game_over(frame: &mut Frame, score: u32, rows_cleared: u32, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("GAME OVER", Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(format!("Score: {}", score)),
        Line::from(format!("Rows: {}", rows_cleared)),
        Line::from(""),
        Line::from(Span::styled(
            "Press R to restart",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Press ESC to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Game Over ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(Color::Black)),
    );

    let popup_area = centered_rect(24, 12, area);
    frame.render_widget(paragraph, popup_area);
}

fn render_paused(frame: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("PAUSED", Style::default().fg(Color::Yellow))),
        Line::from(""),
        Line::from(Span::styled(
            "Press P to continue",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Press ESC to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Paused ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(Color::Black)),
    );

    let popup_area = centered_rect(24, 10, area);
    frame.render_widget(paragraph, popup_area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .split(area);

    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    vertical[1]
}

// ============================================================================
// Main Loop
// ============================================================================

fn main() -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    // Create game; the host keeps score from the engine's events.
    let mut game = Game::new();
    let mut score: u32 = 0;
    let mut rows_cleared: u32 = 0;
    let mut paused = false;
    let mut last_tick = Instant::now();

    // Main loop
    loop {
        // Render
        terminal.draw(|frame| render(frame, &game, score, rows_cleared, paused))?;

        // Calculate time until next tick
        let tick_duration = Duration::from_millis(TICK_MS);
        let timeout = tick_duration
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        // Handle input
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        // Always allow quit
                        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => break,
                        // Always allow pause toggle and restart
                        KeyCode::Char('p') | KeyCode::Char('P') => {
                            paused = !paused;
                        }
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            game.reset();
                            score = 0;
                            rows_cleared = 0;
                            paused = false;
                        }
                        // Only forward game intents while running
                        _ if !paused && !game.is_game_over() => match key.code {
                            KeyCode::Left => game.move_left(),
                            KeyCode::Right => game.move_right(),
                            KeyCode::Down => game.set_drop_fast(true),
                            KeyCode::Up | KeyCode::Char(' ') => game.rotate(),
                            _ => {}
                        },
                        _ => {}
                    }
                }
            }
        }

        // Update game state; pausing is simply withholding ticks.
        if last_tick.elapsed() >= tick_duration {
            if !paused {
                game.tick();
            }
            last_tick = Instant::now();
        }

        // Drain engine events into the host-side score
        for event in game.take_events() {
            if let GameEvent::RowsCleared(count) = event {
                rows_cleared += count;
                score += count * POINTS_PER_ROW;
            }
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
