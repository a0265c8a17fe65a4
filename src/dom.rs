use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Timeout;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, Document, Element, Event, MessageEvent, WebSocket};

use crate::board::Cell;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::{Effect, Input, Session};
use crate::view::{render, View};

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => console::error_1(&msg),
            log::Level::Warn => console::warn_1(&msg),
            log::Level::Info => console::info_1(&msg),
            _ => console::debug_1(&msg),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

impl From<ClientError> for JsValue {
    fn from(e: ClientError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

/// Fixed element handles of the page. Only text and class names are written.
struct DomSurface {
    document: Document,
    board: Element,
    player_id: Element,
    score: Element,
    moves_left: Element,
    max_moves: Element,
    scores_list: Element,
    status: Element,
    quit: Element,
}

impl DomSurface {
    fn locate(document: Document) -> Result<Self, ClientError> {
        let find = |id: &str| {
            document
                .get_element_by_id(id)
                .ok_or_else(|| ClientError::Dom(format!("missing #{}", id)))
        };
        Ok(Self {
            board: find("board")?,
            player_id: find("player-id")?,
            score: find("score")?,
            moves_left: find("moves-left")?,
            max_moves: find("max-moves")?,
            scores_list: find("scores-list")?,
            status: find("game-status")?,
            quit: find("quit-btn")?,
            document,
        })
    }

    fn apply(&self, view: &View) -> Result<(), JsValue> {
        self.player_id.set_text_content(Some(&view.player_id));
        self.score.set_text_content(Some(&view.score));
        self.moves_left.set_text_content(Some(&view.moves_left));
        self.max_moves.set_text_content(Some(&view.max_moves));

        self.board.set_inner_html("");
        for cell in &view.cells {
            let el = self.document.create_element("div")?;
            el.set_class_name(&cell.class_name());
            el.set_text_content(Some(&cell.symbol));
            el.set_attribute("data-row", &cell.row.to_string())?;
            el.set_attribute("data-col", &cell.col.to_string())?;
            self.board.append_child(&el)?;
        }

        self.scores_list.set_inner_html("");
        for row in &view.scores {
            let item = self.document.create_element("div")?;
            item.set_class_name("score-item");
            let player = self.document.create_element("span")?;
            player.set_text_content(Some(&row.player));
            let score = self.document.create_element("span")?;
            score.set_text_content(Some(&row.score.to_string()));
            if row.winner {
                player.set_class_name("winner");
                score.set_class_name("winner");
            }
            item.append_child(&player)?;
            item.append_child(&score)?;
            self.scores_list.append_child(&item)?;
        }

        self.status.set_text_content(Some(&view.status_text));
        self.status.set_class_name(&view.status_class);
        Ok(())
    }
}

#[allow(dead_code)]
struct WsHandlers {
    onopen: Closure<dyn FnMut(Event)>,
    onmessage: Closure<dyn FnMut(MessageEvent)>,
    onerror: Closure<dyn FnMut(Event)>,
    onclose: Closure<dyn FnMut(Event)>,
}

#[allow(dead_code)]
struct DomHandlers {
    board_click: Closure<dyn FnMut(Event)>,
    quit_click: Closure<dyn FnMut(Event)>,
}

struct Runtime {
    session: RefCell<Session>,
    dom: DomSurface,
    socket: RefCell<Option<WebSocket>>,
    ws_handlers: RefCell<Option<WsHandlers>>,
    dom_handlers: RefCell<Option<DomHandlers>>,
}

/// Feeds one input to the session, re-renders, then runs the resulting effects.
fn dispatch(rt: &Rc<Runtime>, input: Input) {
    let (effects, view) = {
        let mut session = rt.session.borrow_mut();
        let effects = session.handle(input);
        (effects, render(&session))
    };
    if let Err(e) = rt.dom.apply(&view) {
        log::error!("render failed: {:?}", e);
    }
    for effect in effects {
        run_effect(rt, effect);
    }
}

fn run_effect(rt: &Rc<Runtime>, effect: Effect) {
    match effect {
        Effect::Send(msg) => {
            let socket = rt.socket.borrow();
            match socket.as_ref() {
                Some(ws) if ws.ready_state() == WebSocket::OPEN => {
                    if let Err(e) = ws.send_with_str(&msg.encode()) {
                        log::warn!("send failed: {:?}", e);
                    }
                }
                _ => log::warn!("socket not open, dropping {:?}", msg),
            }
        }
        Effect::Schedule { delay_ms, timer } => {
            let weak = Rc::downgrade(rt);
            Timeout::new(delay_ms, move || {
                if let Some(rt) = weak.upgrade() {
                    dispatch(&rt, Input::Timer(timer));
                }
            })
            .forget();
        }
        Effect::Reload => {
            let reloaded = web_sys::window().map(|w| w.location().reload());
            if let Some(Err(e)) = reloaded {
                log::error!("reload failed: {:?}", e);
            }
        }
    }
}

fn clicked_cell(event: &Event) -> Option<Cell> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let cell = target.closest(".cell").ok()??;
    let row = cell.get_attribute("data-row")?.parse().ok()?;
    let col = cell.get_attribute("data-col")?.parse().ok()?;
    Some(Cell::new(row, col))
}

fn connect(rt: &Rc<Runtime>) {
    let url = rt.session.borrow().config().server_url.clone();
    let ws = match WebSocket::new(&url) {
        Ok(ws) => ws,
        Err(e) => {
            dispatch(rt, Input::Failed(format!("{:?}", e)));
            return;
        }
    };

    let onopen = {
        let weak = Rc::downgrade(rt);
        Closure::wrap(Box::new(move |_event: Event| {
            with_runtime(&weak, |rt| dispatch(rt, Input::Opened));
        }) as Box<dyn FnMut(Event)>)
    };
    let onmessage = {
        let weak = Rc::downgrade(rt);
        Closure::wrap(Box::new(move |event: MessageEvent| {
            let Some(text) = event.data().as_string() else {
                log::warn!("ignoring non-text frame");
                return;
            };
            with_runtime(&weak, |rt| dispatch(rt, Input::Frame(text)));
        }) as Box<dyn FnMut(MessageEvent)>)
    };
    let onerror = {
        let weak = Rc::downgrade(rt);
        let url = url.clone();
        Closure::wrap(Box::new(move |_event: Event| {
            with_runtime(&weak, |rt| dispatch(rt, Input::Failed(format!("websocket error on {}", url))));
        }) as Box<dyn FnMut(Event)>)
    };
    let onclose = {
        let weak = Rc::downgrade(rt);
        Closure::wrap(Box::new(move |_event: Event| {
            with_runtime(&weak, |rt| dispatch(rt, Input::Closed));
        }) as Box<dyn FnMut(Event)>)
    };

    ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
    ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
    ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
    ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));

    *rt.socket.borrow_mut() = Some(ws);
    *rt.ws_handlers.borrow_mut() = Some(WsHandlers {
        onopen,
        onmessage,
        onerror,
        onclose,
    });
}

fn listen(rt: &Rc<Runtime>) -> Result<(), JsValue> {
    let board_click = {
        let weak = Rc::downgrade(rt);
        Closure::wrap(Box::new(move |event: Event| {
            if let Some(cell) = clicked_cell(&event) {
                with_runtime(&weak, |rt| dispatch(rt, Input::Click(cell)));
            }
        }) as Box<dyn FnMut(Event)>)
    };
    let quit_click = {
        let weak = Rc::downgrade(rt);
        Closure::wrap(Box::new(move |_event: Event| {
            with_runtime(&weak, |rt| dispatch(rt, Input::Quit));
        }) as Box<dyn FnMut(Event)>)
    };
    rt.dom
        .board
        .add_event_listener_with_callback("click", board_click.as_ref().unchecked_ref())?;
    rt.dom
        .quit
        .add_event_listener_with_callback("click", quit_click.as_ref().unchecked_ref())?;
    *rt.dom_handlers.borrow_mut() = Some(DomHandlers {
        board_click,
        quit_click,
    });
    Ok(())
}

fn with_runtime(weak: &Weak<Runtime>, f: impl FnOnce(&Rc<Runtime>)) {
    if let Some(rt) = weak.upgrade() {
        f(&rt);
    }
}

/// Browser entry point. Binds to the page's fixed element ids and connects to
/// `config.server_url`.
#[wasm_bindgen]
pub struct BrowserClient {
    runtime: Rc<Runtime>,
}

#[wasm_bindgen]
impl BrowserClient {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<BrowserClient, JsValue> {
        let config: ClientConfig = from_value(config).unwrap_or_default();
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ClientError::Dom("no document".to_string()))?;
        let dom = DomSurface::locate(document)?;
        let runtime = Rc::new(Runtime {
            session: RefCell::new(Session::new(config)),
            dom,
            socket: RefCell::new(None),
            ws_handlers: RefCell::new(None),
            dom_handlers: RefCell::new(None),
        });
        runtime.dom.apply(&render(&runtime.session.borrow()))?;
        listen(&runtime)?;
        connect(&runtime);
        Ok(BrowserClient { runtime })
    }

    #[wasm_bindgen(js_name = viewState)]
    pub fn view_state(&self) -> Result<JsValue, JsValue> {
        let view = render(&self.runtime.session.borrow());
        to_value(&view).map_err(|e| e.into())
    }

    pub fn quit(&self) {
        dispatch(&self.runtime, Input::Quit);
    }
}
