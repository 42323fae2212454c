use crate::app_state::{App, FocusArea, InputMode, ViewMode, MENU_ITEMS};
use crate::linking::LinkStatus;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 顶部标题栏
            Constraint::Min(0),    // 中间内容区域
            Constraint::Min(8),    // 底部命令/日志区域
        ])
        .split(f.size());

    render_top_bar(f, chunks[0], app);

    let middle_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(chunks[1]);

    render_left_menu(f, middle_chunks[0], app);
    render_main_view(f, middle_chunks[1], app);
    render_bottom_bar(f, chunks[2], app);
}

fn panel_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

fn heading(text: &str) -> Line<'static> {
    Line::from(vec![Span::styled(
        text.to_string(),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )])
}

fn label<'a>(name: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value),
    ])
}

fn fmt_num(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{:.*}", precision, x))
        .unwrap_or_else(|| "N/A".to_string())
}

fn status_style(status: LinkStatus) -> (&'static str, Color) {
    match status {
        LinkStatus::Linked => ("✓", Color::Green),
        LinkStatus::ProductionOnly => ("◐", Color::Yellow),
        LinkStatus::BoundariesOnly => ("◑", Color::Magenta),
        LinkStatus::NoData => ("○", Color::Gray),
    }
}

fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let title = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Cyan));

    let title_text = Line::from(vec![
        Span::styled(
            " 农户产量 / 田块边界关联 ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " - 表单 {} 条, 边界 {} 条",
            app.db_stats.form_responses, app.db_stats.field_boundaries
        )),
    ]);

    let paragraph = Paragraph::new(title_text)
        .block(title)
        .alignment(ratatui::layout::Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_left_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let is_selected = i == app.menu_selected_index;
            let is_active = matches!(
                (i, &app.view_mode),
                (0, ViewMode::Dashboard)
                    | (1, ViewMode::LinkList)
                    | (2, ViewMode::Detail)
                    | (3, ViewMode::CropAnalysis)
                    | (4, ViewMode::Farmer)
            );

            let style = if is_selected {
                if app.focus_area == FocusArea::Menu {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                }
            } else if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            ListItem::new(format!("{}{}", prefix, text)).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "菜单 (Enter/c 确认)"
    } else {
        "菜单 (← 切换)"
    };

    let menu = List::new(menu_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(panel_style(app.focus_area == FocusArea::Menu)),
    );

    f.render_widget(menu, area);
}

fn render_main_view(f: &mut Frame, area: Rect, app: &mut App) {
    let focused = app.focus_area == FocusArea::MainView;
    match app.view_mode {
        ViewMode::Dashboard => {
            let s = &app.dashboard.summary;
            let content = vec![
                heading("--- 关联概览 ---"),
                Line::from(""),
                Line::from(format!("  农户-作物组合: {:>5}", s.total_combinations)),
                Line::from(vec![Span::styled(
                    format!("  完全关联    : {:>5}", s.fully_linked),
                    Style::default().fg(Color::Green),
                )]),
                Line::from(vec![Span::styled(
                    format!("  仅有产量    : {:>5}", s.production_only),
                    Style::default().fg(Color::Yellow),
                )]),
                Line::from(vec![Span::styled(
                    format!("  仅有边界    : {:>5}", s.boundaries_only),
                    Style::default().fg(Color::Magenta),
                )]),
                Line::from(format!("  产量记录    : {:>5}", s.total_production_records)),
                Line::from(format!("  边界记录    : {:>5}", s.total_boundary_records)),
                Line::from(vec![Span::styled(
                    format!("  关联成功率  : {:>5.1}%", s.linking_success_rate * 100.0),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )]),
                Line::from(""),
                heading("--- 数据库 ---"),
                Line::from(format!("  form_responses : {:>6}", app.db_stats.form_responses)),
                Line::from(format!("  field_boundaries: {:>5}", app.db_stats.field_boundaries)),
                Line::from(format!("  合计           : {:>6}", app.db_stats.total_records)),
                Line::from(""),
                Line::from(vec![Span::styled(
                    "提示: 后台定时重新计算，按 r 立即刷新",
                    Style::default()
                        .fg(Color::Gray)
                        .add_modifier(Modifier::ITALIC),
                )]),
            ];
            let title = if focused { "总览 (← 切换菜单)" } else { "总览" };
            let paragraph = Paragraph::new(content).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .style(panel_style(focused)),
            );
            f.render_widget(paragraph, area);
        }
        ViewMode::LinkList => {
            let items: Vec<ListItem> = app
                .link_list
                .iter()
                .map(|r| {
                    let (symbol, color) = status_style(r.status);
                    let content = Line::from(vec![
                        Span::styled(format!("{} ", symbol), Style::default().fg(color)),
                        Span::styled(
                            format!("{:<16}", r.status.as_str()),
                            Style::default().fg(color),
                        ),
                        Span::raw(format!("{:<18} {:<16}", r.farmer_id, r.crop_type)),
                        Span::styled(
                            format!(
                                " 田块 {:>2}  面积 {:>7.2}  产量 {}",
                                r.metrics.total_fields,
                                r.metrics.total_area,
                                fmt_num(r.metrics.quantity_harvested, 1)
                            ),
                            Style::default().fg(Color::Gray),
                        ),
                    ]);
                    ListItem::new(content)
                })
                .collect();

            let status_filter = app.filter_status.map(|s| s.as_str()).unwrap_or("ALL");
            let query_info = if app.filter_query.is_empty() {
                String::new()
            } else {
                format!(" 搜索: \"{}\"", app.filter_query)
            };
            let title = if focused {
                format!(
                    "关联列表 [Filter: {}]{} (f 切换, Enter/c 详情, o 农户, ← 菜单)",
                    status_filter, query_info
                )
            } else {
                format!("关联列表 [Filter: {}]{}", status_filter, query_info)
            };

            let list = List::new(items)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(title)
                        .style(panel_style(focused)),
                )
                .highlight_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol(">> ");
            app.link_list_state.select(Some(app.selected_index));
            f.render_stateful_widget(list, area, &mut app.link_list_state);
        }
        ViewMode::Detail => {
            let content = if let Some(ref detail) = app.selected_detail {
                let (symbol, color) = status_style(detail.status);
                let mut lines = vec![
                    Line::from(vec![
                        Span::styled("农户: ", Style::default().add_modifier(Modifier::BOLD)),
                        Span::styled(detail.farmer_id.clone(), Style::default().fg(Color::Cyan)),
                        Span::raw("  "),
                        Span::styled("作物: ", Style::default().add_modifier(Modifier::BOLD)),
                        Span::styled(detail.crop_type.clone(), Style::default().fg(Color::Cyan)),
                    ]),
                    Line::from(vec![
                        Span::styled("状态: ", Style::default().add_modifier(Modifier::BOLD)),
                        Span::styled(
                            format!("{} {}", symbol, detail.status.as_str()),
                            Style::default().fg(color),
                        ),
                    ]),
                    Line::from(""),
                    heading("--- 汇总指标 ---"),
                ];

                let m = &detail.metrics;
                let unit = m.harvest_unit.clone().unwrap_or_default();
                lines.push(Line::from(format!(
                    "田块数: {:<6} 总面积: {:.2}",
                    m.total_fields, m.total_area
                )));
                lines.push(Line::from(format!(
                    "产量:   {} {}  单位面积产量: {}",
                    fmt_num(m.quantity_harvested, 1),
                    unit,
                    fmt_num(m.yield_per_acre, 2)
                )));
                lines.push(Line::from(format!(
                    "单价:   {}  总价值: {}",
                    fmt_num(m.price_per_unit, 2),
                    fmt_num(m.total_value, 2)
                )));

                lines.push(Line::from(""));
                lines.push(heading("--- 产量数据 ---"));
                match &detail.production {
                    Some(p) => {
                        lines.push(label("季节: ", p.season_year.clone()));
                        lines.push(label("提交时间: ", p.submission_date.clone()));
                        for (key, value) in &p.attributes {
                            let shown = match value {
                                serde_json::Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            lines.push(Line::from(format!("  • {:<22}: {}", key, shown)));
                        }
                    }
                    None => lines.push(Line::from(vec![Span::styled(
                        "  无产量记录",
                        Style::default().fg(Color::Gray),
                    )])),
                }

                lines.push(Line::from(""));
                lines.push(heading("--- 田块边界 ---"));
                if detail.boundaries.is_empty() {
                    lines.push(Line::from(vec![Span::styled(
                        "  无边界记录",
                        Style::default().fg(Color::Gray),
                    )]));
                }
                for b in &detail.boundaries {
                    lines.push(Line::from(format!(
                        "  #{:<4} {:<20} {:<12} 面积 {:>8}  顶点 {}",
                        b.id,
                        b.field_name,
                        b.field_type,
                        fmt_num(b.area_estimate, 2),
                        b.coordinates.len()
                    )));
                }
                lines
            } else {
                vec![Line::from("在关联列表中按 Enter 或输入 `link <farmer_id> <crop>` 查看详情")]
            };

            let title = if focused {
                "关联详情 (↑↓ 滚动, x 返回, ← 切换菜单)"
            } else {
                "关联详情"
            };
            let paragraph = Paragraph::new(content)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(title)
                        .style(panel_style(focused)),
                )
                .scroll((app.detail_scroll, 0));
            f.render_widget(paragraph, area);
        }
        ViewMode::CropAnalysis => {
            let mut lines = vec![
                heading("--- 作物分析（仅完全关联的组合）---"),
                Line::from(""),
                Line::from(vec![Span::styled(
                    format!(
                        "{:<16} {:>6} {:>6} {:>10} {:>12} {:>12} {:>10}",
                        "作物", "农户", "田块", "面积", "产量", "价值", "单产"
                    ),
                    Style::default().add_modifier(Modifier::BOLD),
                )]),
            ];
            for (crop, a) in &app.dashboard.crop_analysis {
                lines.push(Line::from(vec![
                    Span::styled(format!("{:<16}", crop), Style::default().fg(Color::Cyan)),
                    Span::raw(format!(
                        " {:>6} {:>6} {:>10.2} {:>12.1} {:>12.2} {:>10}",
                        a.farmers,
                        a.fields,
                        a.total_area,
                        a.total_production,
                        a.total_value,
                        fmt_num(a.average_yield, 2)
                    )),
                ]));
            }
            if app.dashboard.crop_analysis.is_empty() {
                lines.push(Line::from("暂无完全关联的数据"));
            }
            let title = if focused { "作物分析 (← 切换菜单)" } else { "作物分析" };
            let paragraph = Paragraph::new(lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(title)
                        .style(panel_style(focused)),
                )
                .scroll((app.detail_scroll, 0));
            f.render_widget(paragraph, area);
        }
        ViewMode::Farmer => {
            let content = if let Some(ref farmer) = app.farmer {
                let mut lines = vec![
                    Line::from(vec![
                        Span::styled("农户: ", Style::default().add_modifier(Modifier::BOLD)),
                        Span::styled(farmer.farmer_id.clone(), Style::default().fg(Color::Cyan)),
                    ]),
                    Line::from(""),
                    heading(&format!("--- 表单 ({}) ---", farmer.forms.len())),
                ];
                for form in &farmer.forms {
                    lines.push(Line::from(format!(
                        "  #{:<4} {} | {} / {} | {}",
                        form.id, form.submission_date, form.district, form.village, form.season_year
                    )));
                    lines.push(Line::from(format!("        作物: {}", form.selected_crops.join(", "))));
                    if !form.crops_missing_data.is_empty() {
                        lines.push(Line::from(vec![Span::styled(
                            format!("        ⚠ 缺少作物数据: {}", form.crops_missing_data.join(", ")),
                            Style::default().fg(Color::Yellow),
                        )]));
                    }
                }
                lines.push(Line::from(""));
                lines.push(heading(&format!("--- 田块边界 ({}) ---", farmer.boundaries.len())));
                for b in &farmer.boundaries {
                    lines.push(Line::from(format!(
                        "  #{:<4} {:<20} {:<14} {:<12} 面积 {:>8}",
                        b.id,
                        b.field_name,
                        b.crop_type,
                        b.field_type,
                        fmt_num(b.area_estimate, 2)
                    )));
                }
                lines
            } else {
                vec![Line::from("输入 `farmer <farmer_id>` 或在关联列表中按 o 查看农户")]
            };

            let title = if focused {
                "农户总览 (↑↓ 滚动, x 返回, ← 切换菜单)"
            } else {
                "农户总览"
            };
            let paragraph = Paragraph::new(content)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(title)
                        .style(panel_style(focused)),
                )
                .scroll((app.detail_scroll, 0));
            f.render_widget(paragraph, area);
        }
    }
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let command_prompt = if app.input_mode == InputMode::Command {
        let mut spans = vec![Span::styled(
            "命令: ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )];
        let cur = app.command_cursor.min(app.command_input.len());
        let (left, right) = app.command_input.split_at(cur);
        spans.push(Span::raw(left));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(right));

        if let Some(hint) = app.get_completion_hint() {
            spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
        }

        vec![
            Line::from(spans),
            Line::from("Enter执行 Esc取消 Tab补全 ←→光标 Home/End ↑历史 ↓下一条"),
        ]
    } else {
        vec![
            Line::from(vec![
                Span::styled("命令: ", Style::default().fg(Color::Yellow)),
                Span::raw("(按 / 进入命令模式)"),
            ]),
            Line::from("/命令 f筛选 r刷新 ←→切换 ↑↓导航 Enter/c确认 o农户 x返回 q退出"),
        ]
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(if app.input_mode == InputMode::Command {
                "命令输入模式"
            } else {
                "命令输入"
            })
            .style(if app.input_mode == InputMode::Command {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    // 最新的日志显示在顶部
    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev()
        .take(20)
        .map(|msg| {
            let style = if msg.starts_with('✓') {
                Style::default().fg(Color::Green)
            } else if msg.starts_with('✗') {
                Style::default().fg(Color::Red)
            } else if msg.starts_with('⚠') {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
