use crate::commands::AppCommand;
use crate::linking::model::DatabaseStats;
use crate::linking::{DashboardData, FarmerOverview, LinkRecord, LinkStatus};
use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use std::str::FromStr;
use tokio::sync::mpsc;

pub const MENU_ITEMS: [&str; 5] = ["总览", "关联列表", "关联详情", "作物分析", "农户"];

#[derive(PartialEq, Debug, Clone)]
pub enum ViewMode {
    Dashboard,
    LinkList,
    Detail,
    CropAnalysis,
    Farmer,
}

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
}

#[derive(PartialEq, Debug, Clone)]
pub enum FocusArea {
    Menu,     // 焦点在左侧菜单
    MainView, // 焦点在主视图
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Error(String),
    Dashboard(DashboardData),
    Detail(LinkRecord),
    Farmer(FarmerOverview),
    Stats(DatabaseStats),
}

pub struct App {
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_selected_index: usize,
    pub dashboard: DashboardData,
    pub db_stats: DatabaseStats,
    pub link_list: Vec<LinkRecord>,
    pub selected_index: usize,
    pub link_list_state: ListState,
    pub selected_detail: Option<LinkRecord>,
    pub farmer: Option<FarmerOverview>,
    pub detail_scroll: u16,
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub filter_status: Option<LinkStatus>,
    pub filter_query: String,
    pub log_messages: Vec<String>,
    pub cmd_tx: mpsc::UnboundedSender<AppCommand>,
    pub evt_rx: Option<mpsc::UnboundedReceiver<AppEvent>>,
}

impl App {
    pub fn new(
        startup_info: Vec<String>,
        cmd_tx: mpsc::UnboundedSender<AppCommand>,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(startup_info);

        App {
            view_mode: ViewMode::Dashboard,
            input_mode: InputMode::Normal,
            focus_area: FocusArea::Menu,
            menu_selected_index: 0,
            dashboard: DashboardData::default(),
            db_stats: DatabaseStats::default(),
            link_list: Vec::new(),
            selected_index: 0,
            link_list_state: {
                let mut s = ListState::default();
                s.select(Some(0));
                s
            },
            selected_detail: None,
            farmer: None,
            detail_scroll: 0,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            filter_status: None,
            filter_query: String::new(),
            log_messages,
            cmd_tx,
            evt_rx: Some(evt_rx),
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(msg) | AppEvent::Message(msg) | AppEvent::Error(msg) => {
                self.add_log(msg)
            }
            AppEvent::Dashboard(data) => {
                self.dashboard = data;
                self.apply_filters();
                self.clamp_selection();
            }
            AppEvent::Detail(record) => {
                self.selected_detail = Some(record);
                self.detail_scroll = 0;
                self.show(ViewMode::Detail);
            }
            AppEvent::Farmer(overview) => {
                self.farmer = Some(overview);
                self.detail_scroll = 0;
                self.show(ViewMode::Farmer);
            }
            AppEvent::Stats(stats) => self.db_stats = stats,
        }
    }

    fn show(&mut self, view: ViewMode) {
        self.menu_selected_index = match view {
            ViewMode::Dashboard => 0,
            ViewMode::LinkList => 1,
            ViewMode::Detail => 2,
            ViewMode::CropAnalysis => 3,
            ViewMode::Farmer => 4,
        };
        self.view_mode = view;
    }

    /// 获取当前的预测建议
    pub fn get_completion_hint(&self) -> Option<String> {
        let commands = [
            "link", "farmer", "dataset", "stats", "refresh", "import", "export", "filter", "help",
            "quit",
        ];
        let input = self.command_input.trim();
        if input.is_empty() {
            return None;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.len() == 1 {
            for cmd in commands {
                if cmd.starts_with(parts[0]) && cmd != parts[0] {
                    return Some(cmd[parts[0].len()..].to_string());
                }
            }
            return None;
        }

        // link/farmer 的农户编号从当前数据中补全
        if matches!(parts[0], "link" | "farmer") && parts.len() == 2 {
            let cur = parts[1];
            return self
                .dashboard
                .records
                .iter()
                .map(|r| r.farmer_id.as_str())
                .find(|id| id.starts_with(cur) && *id != cur)
                .map(|id| id[cur.len()..].to_string());
        }
        None
    }

    pub fn clamp_selection(&mut self) {
        if self.selected_index >= self.link_list.len() {
            self.selected_index = self.link_list.len().saturating_sub(1);
        }
        self.link_list_state.select(Some(self.selected_index));
    }

    pub fn apply_filters(&mut self) {
        let query = self.filter_query.to_lowercase();
        self.link_list = self
            .dashboard
            .records
            .iter()
            .filter(|r| self.filter_status.map_or(true, |s| r.status == s))
            .filter(|r| {
                query.is_empty()
                    || r.farmer_id.to_lowercase().contains(&query)
                    || r.crop_type.to_lowercase().contains(&query)
            })
            .cloned()
            .collect();

        if self.selected_index >= self.link_list.len() {
            self.selected_index = 0;
        }
        self.link_list_state.select(Some(self.selected_index));
    }

    fn cycle_status_filter(&mut self) {
        self.filter_status = match self.filter_status {
            None => Some(LinkStatus::Linked),
            Some(LinkStatus::Linked) => Some(LinkStatus::ProductionOnly),
            Some(LinkStatus::ProductionOnly) => Some(LinkStatus::BoundariesOnly),
            Some(LinkStatus::BoundariesOnly) => Some(LinkStatus::NoData),
            Some(LinkStatus::NoData) => None,
        };
        self.apply_filters();
    }

    /// 请求当前选中组合的详情
    pub fn request_detail(&mut self) {
        if let Some(record) = self.link_list.get(self.selected_index) {
            self.detail_scroll = 0;
            let _ = self.cmd_tx.send(AppCommand::Link {
                farmer_id: record.farmer_id.clone(),
                crop_type: record.crop_type.clone(),
            });
        }
    }

    fn request_farmer(&mut self) {
        let farmer_id = self
            .link_list
            .get(self.selected_index)
            .map(|r| r.farmer_id.clone())
            .or_else(|| self.farmer.as_ref().map(|f| f.farmer_id.clone()));
        if let Some(farmer_id) = farmer_id {
            let _ = self.cmd_tx.send(AppCommand::Farmer { farmer_id });
        }
    }

    fn finish_command(&mut self, cmd: String) {
        self.command_history.push(cmd);
        self.command_history_index = None;
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    fn apply_filter_command(&mut self, args: &str) {
        if args.is_empty() || args == "clear" {
            self.filter_query.clear();
            self.filter_status = None;
        } else {
            let mut query_parts: Vec<&str> = Vec::new();
            for tok in args.split_whitespace() {
                match tok.to_ascii_lowercase().as_str() {
                    "linked" => self.filter_status = Some(LinkStatus::Linked),
                    "production_only" => self.filter_status = Some(LinkStatus::ProductionOnly),
                    "boundaries_only" => self.filter_status = Some(LinkStatus::BoundariesOnly),
                    "no_data" => self.filter_status = Some(LinkStatus::NoData),
                    "all" => self.filter_status = None,
                    _ => query_parts.push(tok),
                }
            }
            self.filter_query = query_parts.join(" ");
        }
        self.apply_filters();
        self.show(ViewMode::LinkList);
    }

    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        if self.input_mode == InputMode::Command {
            match key {
                KeyCode::Enter => {
                    let cmd_owned = self.command_input.trim().to_string();
                    if cmd_owned.is_empty() {
                        self.command_input.clear();
                        self.command_cursor = 0;
                        self.input_mode = InputMode::Normal;
                        return false;
                    }

                    let (head, rest) = cmd_owned
                        .split_once(char::is_whitespace)
                        .unwrap_or((cmd_owned.as_str(), ""));
                    if head == "filter" {
                        let args = rest.trim().to_string();
                        self.apply_filter_command(&args);
                        self.finish_command(cmd_owned);
                        return false;
                    }

                    let app_cmd = AppCommand::from_str(&cmd_owned)
                        .unwrap_or_else(|_| AppCommand::Unknown(cmd_owned.clone()));
                    let quit = app_cmd == AppCommand::Quit;
                    let _ = self.cmd_tx.send(app_cmd);
                    self.finish_command(cmd_owned);
                    return quit;
                }
                KeyCode::Esc => {
                    self.command_input.clear();
                    self.command_cursor = 0;
                    self.input_mode = InputMode::Normal;
                    return false;
                }
                KeyCode::Tab => {
                    if let Some(hint) = self.get_completion_hint() {
                        let insert = format!("{} ", hint);
                        self.command_input.insert_str(self.command_cursor, &insert);
                        self.command_cursor += insert.len();
                    }
                    return false;
                }
                KeyCode::Up => {
                    if self.command_history.is_empty() {
                        return false;
                    }
                    let next = match self.command_history_index {
                        None => self.command_history.len().saturating_sub(1),
                        Some(i) => i.saturating_sub(1),
                    };
                    self.command_history_index = Some(next);
                    if let Some(cmd) = self.command_history.get(next) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.command_input.len();
                    }
                    return false;
                }
                KeyCode::Down => {
                    let next = match self.command_history_index {
                        None => return false,
                        Some(i) => {
                            let n = i + 1;
                            if n >= self.command_history.len() {
                                self.command_history_index = None;
                                self.command_input.clear();
                                self.command_cursor = 0;
                                return false;
                            }
                            n
                        }
                    };
                    self.command_history_index = Some(next);
                    if let Some(cmd) = self.command_history.get(next) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.command_input.len();
                    }
                    return false;
                }
                KeyCode::Backspace => {
                    if self.command_cursor > 0 {
                        let prev = self.command_input[..self.command_cursor]
                            .char_indices()
                            .last()
                            .map(|(i, _)| i)
                            .unwrap_or(0);
                        self.command_input.remove(prev);
                        self.command_cursor = prev;
                    }
                    return false;
                }
                KeyCode::Delete => {
                    if self.command_cursor < self.command_input.len() {
                        self.command_input.remove(self.command_cursor);
                    }
                    return false;
                }
                KeyCode::Left => {
                    if let Some((i, _)) = self.command_input[..self.command_cursor].char_indices().last() {
                        self.command_cursor = i;
                    }
                    return false;
                }
                KeyCode::Right => {
                    if let Some(c) = self.command_input[self.command_cursor..].chars().next() {
                        self.command_cursor += c.len_utf8();
                    }
                    return false;
                }
                KeyCode::Home => {
                    self.command_cursor = 0;
                    return false;
                }
                KeyCode::End => {
                    self.command_cursor = self.command_input.len();
                    return false;
                }
                KeyCode::Char(c) => {
                    self.command_input.insert(self.command_cursor, c);
                    self.command_cursor += c.len_utf8();
                    return false;
                }
                _ => return false,
            }
        }

        // 正常模式下的按键处理
        match key {
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Command;
                self.command_input.clear();
                self.command_cursor = 0;
                false
            }
            KeyCode::Char('q') => true,
            KeyCode::Char('r') => {
                let _ = self.cmd_tx.send(AppCommand::Refresh);
                false
            }
            KeyCode::Left => {
                self.focus_area = FocusArea::Menu;
                false
            }
            KeyCode::Right => {
                self.focus_area = FocusArea::MainView;
                false
            }
            KeyCode::Up => {
                if self.focus_area == FocusArea::Menu {
                    self.menu_selected_index = self.menu_selected_index.saturating_sub(1);
                } else if self.view_mode == ViewMode::LinkList {
                    self.selected_index = self.selected_index.saturating_sub(1);
                } else {
                    self.detail_scroll = self.detail_scroll.saturating_sub(1);
                }
                false
            }
            KeyCode::Down => {
                if self.focus_area == FocusArea::Menu {
                    if self.menu_selected_index < MENU_ITEMS.len() - 1 {
                        self.menu_selected_index += 1;
                    }
                } else if self.view_mode == ViewMode::LinkList {
                    if self.selected_index < self.link_list.len().saturating_sub(1) {
                        self.selected_index += 1;
                    }
                } else {
                    self.detail_scroll = self.detail_scroll.saturating_add(1);
                }
                false
            }
            KeyCode::Enter | KeyCode::Char('c') => {
                if self.focus_area == FocusArea::Menu {
                    match self.menu_selected_index {
                        0 => self.view_mode = ViewMode::Dashboard,
                        1 => self.view_mode = ViewMode::LinkList,
                        2 => {
                            self.view_mode = ViewMode::Detail;
                            if self.selected_detail.is_none() {
                                self.request_detail();
                            }
                        }
                        3 => self.view_mode = ViewMode::CropAnalysis,
                        4 => {
                            self.view_mode = ViewMode::Farmer;
                            if self.farmer.is_none() {
                                self.request_farmer();
                            }
                        }
                        _ => {}
                    }
                    self.focus_area = FocusArea::MainView;
                } else if self.view_mode == ViewMode::LinkList && !self.link_list.is_empty() {
                    self.request_detail();
                }
                false
            }
            KeyCode::Char('o') => {
                if self.focus_area == FocusArea::MainView && self.view_mode == ViewMode::LinkList {
                    self.request_farmer();
                }
                false
            }
            KeyCode::Char('x') => {
                if self.focus_area == FocusArea::MainView
                    && matches!(self.view_mode, ViewMode::Detail | ViewMode::Farmer)
                {
                    self.show(ViewMode::LinkList);
                }
                false
            }
            KeyCode::Char('f') => {
                if self.focus_area == FocusArea::MainView && self.view_mode == ViewMode::LinkList {
                    self.cycle_status_filter();
                }
                false
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linking::dashboard::build_dashboard;
    use crate::linking::model::SummaryMetrics;

    fn record(farmer: &str, crop: &str, status: LinkStatus) -> LinkRecord {
        LinkRecord {
            status,
            farmer_id: farmer.to_string(),
            crop_type: crop.to_string(),
            production: None,
            boundaries: Vec::new(),
            metrics: SummaryMetrics::default(),
        }
    }

    fn app() -> (App, mpsc::UnboundedReceiver<AppCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (_evt_tx, evt_rx) = mpsc::unbounded_channel();
        let mut app = App::new(Vec::new(), cmd_tx, evt_rx);
        app.handle_event(AppEvent::Dashboard(build_dashboard(vec![
            record("EA10208-HH0012", "Coconut", LinkStatus::Linked),
            record("EA10208-HH0012", "Cocoa", LinkStatus::Linked),
            record("EA10208-HH0013", "Kava", LinkStatus::ProductionOnly),
            record("EA10208-HH0014", "Other", LinkStatus::BoundariesOnly),
        ])));
        (app, cmd_rx)
    }

    fn type_command(app: &mut App, cmd: &str) -> bool {
        app.handle_key_event(KeyCode::Char('/'));
        for c in cmd.chars() {
            app.handle_key_event(KeyCode::Char(c));
        }
        app.handle_key_event(KeyCode::Enter)
    }

    #[test]
    fn status_filter_cycles() {
        let (mut app, _rx) = app();
        assert_eq!(app.link_list.len(), 4);
        app.focus_area = FocusArea::MainView;
        app.view_mode = ViewMode::LinkList;

        app.handle_key_event(KeyCode::Char('f'));
        assert_eq!(app.filter_status, Some(LinkStatus::Linked));
        assert_eq!(app.link_list.len(), 2);

        app.handle_key_event(KeyCode::Char('f'));
        assert_eq!(app.link_list.len(), 1);
        assert_eq!(app.link_list[0].crop_type, "Kava");
    }

    #[test]
    fn filter_command_matches_text_case_insensitively() {
        let (mut app, _rx) = app();
        type_command(&mut app, "filter hh0012");
        assert_eq!(app.view_mode, ViewMode::LinkList);
        assert_eq!(app.link_list.len(), 2);

        type_command(&mut app, "filter boundaries_only");
        assert_eq!(app.link_list.len(), 1);
        assert_eq!(app.filter_status, Some(LinkStatus::BoundariesOnly));

        type_command(&mut app, "filter clear");
        assert_eq!(app.link_list.len(), 4);
    }

    #[test]
    fn filter_must_be_a_whole_word() {
        let (mut app, mut rx) = app();
        type_command(&mut app, "filter linked");
        assert_eq!(app.link_list.len(), 2);

        type_command(&mut app, "filterx");
        assert_eq!(
            rx.try_recv().unwrap(),
            AppCommand::Unknown("未知命令: filterx".to_string())
        );
        assert_eq!(app.filter_status, Some(LinkStatus::Linked));
        assert_eq!(app.link_list.len(), 2);
    }

    #[test]
    fn enter_on_list_requests_detail() {
        let (mut app, mut rx) = app();
        app.focus_area = FocusArea::MainView;
        app.view_mode = ViewMode::LinkList;
        app.handle_key_event(KeyCode::Down);
        app.handle_key_event(KeyCode::Enter);

        assert_eq!(
            rx.try_recv().unwrap(),
            AppCommand::Link {
                farmer_id: "EA10208-HH0012".to_string(),
                crop_type: "Cocoa".to_string(),
            }
        );
    }

    #[test]
    fn quit_command_exits_and_reaches_actor() {
        let (mut app, mut rx) = app();
        assert!(type_command(&mut app, "quit"));
        assert_eq!(rx.try_recv().unwrap(), AppCommand::Quit);
        assert_eq!(app.command_history, vec!["quit".to_string()]);
    }

    #[test]
    fn completion_suggests_farmer_ids() {
        let (mut app, _rx) = app();
        app.command_input = "farmer EA10208-HH001".to_string();
        assert_eq!(app.get_completion_hint(), Some("2".to_string()));
        app.command_input = "exp".to_string();
        assert_eq!(app.get_completion_hint(), Some("ort".to_string()));
    }
}
