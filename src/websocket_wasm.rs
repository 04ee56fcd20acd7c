//! WASM WebSocket client for cityIO
//!
//! Reconnects after every close with the supervisor's backoff, scheduled with
//! `setTimeout`. Each new socket subscribes to the table again.
//!
//! The event handler closures live with their socket in a [`Connection`] and
//! are released when the socket is replaced or the client is dropped.

use crate::core::protocol::TableName;
use crate::core::{ConnectionSlot, ConnectionSupervisor};
use crate::ws_state::WsState;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

/// Shared message buffer: WS callback pushes, app drains in tick()
pub type MessageBuffer = Rc<RefCell<VecDeque<String>>>;

/// One socket and the handlers attached to it
struct Connection {
    ws: WebSocket,
    _on_open: Closure<dyn Fn(JsValue)>,
    _on_msg: Closure<dyn Fn(MessageEvent)>,
    _on_err: Closure<dyn Fn(ErrorEvent)>,
    _on_close: Closure<dyn Fn(CloseEvent)>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.ws.set_onopen(None);
        self.ws.set_onmessage(None);
        self.ws.set_onerror(None);
        self.ws.set_onclose(None);
    }
}

struct Shared {
    url: String,
    supervisor: RefCell<ConnectionSupervisor>,
    buffer: MessageBuffer,
    sockets: RefCell<ConnectionSlot<Connection>>,
    stopped: Cell<bool>,
}

/// WASM WebSocket client
pub struct WsClient {
    shared: Rc<Shared>,
}

impl WsClient {
    /// Connect to a WebSocket endpoint and subscribe to `table`
    ///
    /// Messages are buffered into `msg_buffer` for the app to drain with a time budget.
    pub fn connect(url: &str, table: TableName, msg_buffer: MessageBuffer) -> Self {
        let shared = Rc::new(Shared {
            url: url.to_string(),
            supervisor: RefCell::new(ConnectionSupervisor::new(table)),
            buffer: msg_buffer,
            sockets: RefCell::new(ConnectionSlot::new()),
            stopped: Cell::new(false),
        });
        open(&shared);
        Self { shared }
    }

    /// Get the current connection state
    pub fn state(&self) -> WsState {
        self.shared.supervisor.borrow().state().clone()
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.shared.stopped.set(true);
        // handlers hold the shared state; releasing them here breaks the cycle
        let live = self.shared.sockets.borrow_mut().take();
        if let Some(conn) = live {
            let ws = conn.ws.clone();
            drop(conn);
            let _ = ws.close();
        }
    }
}

fn open(shared: &Rc<Shared>) {
    shared.sockets.borrow_mut().begin_attempt();
    if shared.stopped.get() {
        return;
    }
    shared.supervisor.borrow_mut().on_connecting();
    info!(url = %shared.url, "Connecting to WebSocket");

    match WebSocket::new(&shared.url) {
        Ok(ws) => {
            let conn = attach_handlers(shared, ws);
            shared.sockets.borrow_mut().install(conn);
        }
        Err(e) => {
            error!(?e, "Failed to create WebSocket");
            shared.supervisor.borrow_mut().on_error(format!("{e:?}"));
            schedule_reconnect(shared);
        }
    }
}

fn attach_handlers(shared: &Rc<Shared>, ws: WebSocket) -> Connection {
    // On open - update state and subscribe
    let ws_clone = ws.clone();
    let shared_clone = shared.clone();
    let on_open = Closure::wrap(Box::new(move |_| {
        info!("WebSocket connected");
        let Some(listen) = shared_clone.supervisor.borrow_mut().on_open() else {
            return;
        };
        match listen.to_json() {
            Ok(text) => {
                debug!(message = %text, "Sending subscribe message");
                if let Err(e) = ws_clone.send_with_str(&text) {
                    error!(?e, "Failed to send subscribe message");
                }
            }
            Err(e) => error!(error = %e, "Failed to encode subscribe message"),
        }
    }) as Box<dyn Fn(JsValue)>);
    ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

    // On message - push to buffer (processed in tick())
    let buffer = shared.buffer.clone();
    let on_msg = Closure::wrap(Box::new(move |e: MessageEvent| {
        if let Ok(txt) = e.data().dyn_into::<js_sys::JsString>() {
            let msg: String = txt.into();
            buffer.borrow_mut().push_back(msg);
        }
    }) as Box<dyn Fn(MessageEvent)>);
    ws.set_onmessage(Some(on_msg.as_ref().unchecked_ref()));

    // On error - a close event follows
    let shared_clone = shared.clone();
    let on_err = Closure::wrap(Box::new(move |e: ErrorEvent| {
        shared_clone.supervisor.borrow_mut().on_error(e.message());
    }) as Box<dyn Fn(ErrorEvent)>);
    ws.set_onerror(Some(on_err.as_ref().unchecked_ref()));

    // On close - retire this socket and schedule the next attempt
    let shared_clone = shared.clone();
    let on_close = Closure::wrap(Box::new(move |e: CloseEvent| {
        warn!(code = e.code(), reason = %e.reason(), "WebSocket closed");
        shared_clone.sockets.borrow_mut().retire();
        schedule_reconnect(&shared_clone);
    }) as Box<dyn Fn(CloseEvent)>);
    ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

    Connection {
        ws,
        _on_open: on_open,
        _on_msg: on_msg,
        _on_err: on_err,
        _on_close: on_close,
    }
}

fn schedule_reconnect(shared: &Rc<Shared>) {
    if shared.stopped.get() {
        return;
    }
    let delay = shared.supervisor.borrow_mut().on_closed();

    let Some(window) = web_sys::window() else {
        error!("No window, cannot schedule reconnect");
        return;
    };
    let shared_clone = shared.clone();
    let retry = Closure::once_into_js(move || open(&shared_clone));
    if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        retry.unchecked_ref(),
        delay.as_millis() as i32,
    ) {
        error!(?e, "Failed to schedule reconnect");
    }
}
