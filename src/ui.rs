use std::io::Stdout;

use anyhow::Result;
use ratatui::{
    layout::{Constraint, Direction, Layout, Margin, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Gauge, Paragraph, Wrap},
};

use crate::app::AppState;
use crate::model::{self, BandIntensity, Phase, ANGLE_MAX};
use crate::sky;

pub(crate) fn draw(terminal: &mut Terminal<CrosstermBackend<Stdout>>, st: &AppState) -> Result<()> {
    terminal.draw(|f| {
        let area = f.size();

        let outer = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(vec![
                Span::styled(" rayleigh ", Style::default().add_modifier(Modifier::BOLD)),
                Span::styled(
                    format!("{} ", Phase::of(st.angle).label()),
                    Style::default().fg(if st.mono { Color::White } else { Color::Cyan }),
                ),
            ]))
            .border_style(Style::default().fg(if st.mono { Color::Gray } else { Color::DarkGray }));
        f.render_widget(outer, area);

        let inner = area.inner(Margin {
            horizontal: 1,
            vertical: 1,
        });
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(inner);

        render_slider(f, rows[0], st);
        render_main(f, rows[1], st);
        render_footer(f, rows[2], st);
    })?;

    Ok(())
}

fn render_slider(f: &mut Frame, area: Rect, st: &AppState) {
    let sun = model::sun_color(st.angle);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Sun elevation"))
        .gauge_style(Style::default().fg(if st.mono { Color::Gray } else { sun.to_color() }))
        .ratio((st.angle / ANGLE_MAX).clamp(0.0, 1.0))
        .label(format!("{:5.1} deg  {}", st.angle, Phase::of(st.angle).label()));
    f.render_widget(gauge, area);
}

fn render_main(f: &mut Frame, area: Rect, st: &AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(36)])
        .split(area);

    render_sky(f, cols[0], st);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9),
            Constraint::Length(5),
            Constraint::Min(0),
        ])
        .split(cols[1]);

    render_chart(f, side[0], st);
    render_readout(f, side[1], st);
    render_explanation(f, side[2], st);
}

fn render_sky(f: &mut Frame, area: Rect, st: &AppState) {
    let block = Block::default().borders(Borders::ALL).title("Sky");
    let inner = block.inner(area);
    let lines = sky::render(st.angle, st.mono, inner.width, inner.height);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

// The chart widget owns axes and layout; this side owns only the ordered
// Blue/Green/Red rows it is fed.
pub(crate) fn chart_rows(table: &[BandIntensity]) -> Vec<(&'static str, u64, Color)> {
    table
        .iter()
        .map(|row| (row.band.name, row.intensity.round() as u64, row.band.color))
        .collect()
}

fn render_chart(f: &mut Frame, area: Rect, st: &AppState) {
    let rows = chart_rows(&st.scattering);
    let bars: Vec<Bar> = rows
        .iter()
        .map(|(name, value, color)| {
            let color = if st.mono { Color::Gray } else { *color };
            Bar::default()
                .value(*value)
                .text_value(format!("{value}"))
                .label(Line::from(*name))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Scattering (blue = 100)"),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(9)
        .bar_gap(2);
    f.render_widget(chart, area);
}

fn render_readout(f: &mut Frame, area: Rect, st: &AppState) {
    let lines = vec![
        Line::from(format!(
            "Elevation above horizon: {:4.1} deg",
            model::effective_angle(st.angle)
        )),
        Line::from(format!(
            "Atmosphere path: {:5.2}x zenith",
            model::path_length_factor(st.angle)
        )),
        Line::from(format!("Sunset factor: {:4.2}", model::sunset_factor(st.angle))),
    ];
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Readout")),
        area,
    );
}

fn render_explanation(f: &mut Frame, area: Rect, st: &AppState) {
    let block = Block::default().borders(Borders::ALL).title("Explanation");
    let dim = Style::default().fg(if st.mono { Color::White } else { Color::Gray });

    let lines: Vec<Line> = if st.explaining {
        vec![Line::styled("Asking for an explanation...", dim)]
    } else if let Some(e) = &st.explanation {
        let mut lines = vec![Line::from(e.text.clone())];
        lines.push(Line::from(""));
        lines.push(Line::styled(
            format!("Fetched: {}", e.fetched_at.format("%H:%M:%S")),
            dim,
        ));
        lines
    } else if st.online {
        vec![Line::styled("Press e for a short explanation.", dim)]
    } else {
        vec![
            Line::styled("Press e for a short explanation.", dim),
            Line::from(""),
            Line::styled("No ANTHROPIC_API_KEY set: e answers in offline mode.", dim),
        ]
    };

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_footer(f: &mut Frame, area: Rect, st: &AppState) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let spans = vec![
        Span::styled("\u{2190}/\u{2192}", bold),
        Span::raw(" angle \u{b1}0.5  "),
        Span::styled("\u{2191}/\u{2193}", bold),
        Span::raw(" \u{b1}5  "),
        Span::styled("Home/End", bold),
        Span::raw(" horizons  "),
        Span::styled("n", bold),
        Span::raw(" noon  "),
        Span::styled("e", bold),
        Span::raw(" explain  "),
        Span::styled("m", bold),
        Span::raw(if st.mono { " color  " } else { " mono  " }),
        Span::styled("q", bold),
        Span::raw(" quit"),
    ];
    f.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL).title("Keys")),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_rows_keep_display_order_and_normalization() {
        let rows = chart_rows(&model::scattering_table());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "Blue");
        assert_eq!(rows[1].0, "Green");
        assert_eq!(rows[2].0, "Red");
        assert_eq!(rows[0].1, 100);
        assert_eq!(rows[1].1, 45);
        assert_eq!(rows[2].1, 23);
    }
}
