use std::{
    collections::HashMap,
    io::{self, Write},
    net::{TcpListener, TcpStream},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex
    },
    thread,
    time::Duration
};

use gust::{
    handshake::{self, Request},
    server,
    stream::NoDelay,
    MessageSender, WebSocketConfig
};

const CLIENT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>gust chat</title></head>
<body>
  <ul id="messages"></ul>
  <form id="form"><input id="input" autocomplete="off" /><button>Send</button></form>
  <script>
    const ws = new WebSocket("ws://" + location.host + "/server");
    ws.onmessage = (event) => {
      const li = document.createElement("li");
      li.textContent = event.data;
      document.getElementById("messages").appendChild(li);
    };
    document.getElementById("form").onsubmit = (event) => {
      event.preventDefault();
      const input = document.getElementById("input");
      if (input.value) { ws.send(input.value); input.value = ""; }
    };
  </script>
</body>
</html>
"#;

/// All connected chat peers, keyed by join order.
///
/// Entries are removed as soon as a peer's stream fails, from whichever thread
/// notices first.
#[derive(Default)]
struct Registry {
    peers: Mutex<HashMap<u64, MessageSender<TcpStream>>>,
    next_id: AtomicU64
}

impl Registry {
    fn add(&self, sender: MessageSender<TcpStream>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, sender);
        id
    }

    fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    fn broadcast(&self, text: &str) {
        self.lock().retain(|id, sender| match sender.send(text) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("Dropping peer {id}: {e}");
                let _ = sender.shutdown();
                false
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, MessageSender<TcpStream>>> {
        self.peers.lock().expect("Bug: registry lock poisoned")
    }
}

fn main() -> io::Result<()> {
    let listener = TcpListener::bind("0.0.0.0:8000").expect("Could not bind to address");
    let registry = Arc::new(Registry::default());

    println!("Chat on http://0.0.0.0:8000 (page at /client, socket at /server)");

    for stream in listener.incoming() {
        let stream = stream?;
        let registry = Arc::clone(&registry);

        thread::spawn(move || {
            if let Err(e) = handle_connection(stream, &registry) {
                eprintln!("Error handling connection: {e}");
            }
        });
    }

    Ok(())
}

fn handle_connection(mut stream: TcpStream, registry: &Registry) -> gust::Result<()> {
    NoDelay::set_nodelay(&mut stream, true)?;

    let req = handshake::read_request(&mut stream)?;

    match req.uri().path() {
        "/client" => serve_page(stream),
        "/server" => run_chat(&req, stream, registry),
        _ => serve_not_found(stream)
    }
}

fn serve_page(mut stream: TcpStream) -> gust::Result<()> {
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        CLIENT_PAGE.len(),
        CLIENT_PAGE
    );

    stream.write_all(response.as_bytes())?;
    stream.flush()?;

    Ok(())
}

fn serve_not_found(mut stream: TcpStream) -> gust::Result<()> {
    let body = "Not Found";
    let response = format!(
        "HTTP/1.1 404 Not Found\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );

    stream.write_all(response.as_bytes())?;
    stream.flush()?;

    Ok(())
}

fn run_chat(req: &Request, stream: TcpStream, registry: &Registry) -> gust::Result<()> {
    // Peers may idle as long as they like, but a stalled receiver must not be
    // able to wedge broadcast senders forever.
    let config = WebSocketConfig {
        read_timeout: None,
        write_timeout: Some(Duration::from_secs(10))
    };

    let mut ws = server::upgrade_with_config(req, stream, config)?;

    let id = registry.add(ws.sender());
    println!("Peer {id} joined");

    loop {
        match ws.read() {
            Ok(msg) => registry.broadcast(&msg),
            Err(e) => {
                println!("Peer {id} left: {e}");
                registry.remove(id);
                let _ = ws.close();

                return Ok(());
            }
        }
    }
}
