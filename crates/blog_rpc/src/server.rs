//! TCP server for the blog RPC surface.
//!
//! # Responsibility
//! - Accept connections and run one task per connection.
//! - Run handlers on the blocking pool and write reply frames.
//! - Stream `ListBlogs` results one post at a time.
//!
//! # Invariants
//! - Requests on one connection are answered in order.
//! - At most one list item is in flight between handler and socket; a dead
//!   socket stops enumeration at the next send.
//! - A list reader that stalls holds no store lock, so other connections keep
//!   being served.
//! - Shutdown stops accepting and aborts every open connection task.

use crate::dispatch::Dispatcher;
use crate::protocol::{
    decode_line, encode_line, Blog, Code, Frame, ListBlogsRequest, ListBlogsResponse, Request,
    Status,
};
use crate::store::Store;
use blog_core::{BlogPost, PostSink, SinkClosed};
use log::{debug, error, info, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{self, JoinError, JoinSet};

/// Blog RPC server bound to one store.
pub struct BlogServer {
    dispatcher: Dispatcher,
}

impl BlogServer {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            dispatcher: Dispatcher::new(store),
        }
    }

    /// Serves `listener` until `shutdown` resolves.
    ///
    /// In-flight connections are aborted on shutdown; handlers already on the
    /// blocking pool run to completion but their replies are discarded.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!(
            "event=server_start module=server status=ok addr={}",
            local_addr
        );

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let dispatcher = self.dispatcher.clone();
                        connections.spawn(serve_connection(dispatcher, stream, peer));
                    }
                    Err(err) => {
                        warn!("event=conn_accept module=server status=error error={}", err);
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(err) = joined {
                        error!("event=conn_task module=server status=error error={}", err);
                    }
                }
            }
        }

        let open = connections.len();
        connections.shutdown().await;
        info!(
            "event=server_stop module=server status=ok addr={} aborted_connections={}",
            local_addr, open
        );
        Ok(())
    }
}

async fn serve_connection(dispatcher: Dispatcher, stream: TcpStream, peer: SocketAddr) {
    debug!("event=conn_open module=server peer={}", peer);
    match handle_connection(dispatcher, stream).await {
        Ok(()) => debug!("event=conn_close module=server status=ok peer={}", peer),
        Err(err) => warn!(
            "event=conn_close module=server status=error peer={} error={}",
            peer, err
        ),
    }
}

async fn handle_connection(dispatcher: Dispatcher, stream: TcpStream) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: Request = match decode_line(&line) {
            Ok(request) => request,
            Err(err) => {
                let status = Status::new(Code::InvalidArgument, format!("malformed request: {err}"));
                write_frame(&mut writer, &Frame::Error(status)).await?;
                continue;
            }
        };
        debug!("event=rpc_call module=server method={}", request.method());

        match request {
            Request::ListBlogs(request) => stream_list(&dispatcher, request, &mut writer).await?,
            request => {
                let dispatcher = dispatcher.clone();
                let frame = match task::spawn_blocking(move || dispatcher.unary(request)).await {
                    Ok(Ok(response)) => Frame::Unary(response),
                    Ok(Err(status)) => Frame::Error(status),
                    Err(err) => Frame::Error(handler_crashed(err)),
                };
                write_frame(&mut writer, &frame).await?;
            }
        }
    }

    Ok(())
}

/// Feeds list items from the blocking handler to the socket.
async fn stream_list(
    dispatcher: &Dispatcher,
    request: ListBlogsRequest,
    writer: &mut OwnedWriteHalf,
) -> io::Result<()> {
    let (tx, mut rx) = mpsc::channel::<BlogPost>(1);
    let dispatcher = dispatcher.clone();
    let producer = task::spawn_blocking(move || {
        let mut sink = ChannelSink { tx };
        dispatcher.list_blogs(request, &mut sink)
    });

    let mut delivery = Ok(());
    while let Some(post) = rx.recv().await {
        let frame = Frame::StreamItem(ListBlogsResponse {
            blog: Blog::without_id(post),
        });
        if let Err(err) = write_frame(writer, &frame).await {
            delivery = Err(err);
            break;
        }
    }
    // Must happen before awaiting the producer: its next send then fails.
    drop(rx);

    let outcome = producer.await;
    delivery?;

    let frame = match outcome {
        Ok(Ok(delivered)) => {
            debug!(
                "event=rpc_stream module=server status=ok method=ListBlogs delivered={}",
                delivered
            );
            Frame::StreamEnd
        }
        Ok(Err(status)) => Frame::Error(status),
        Err(err) => Frame::Error(handler_crashed(err)),
    };
    write_frame(writer, &frame).await
}

struct ChannelSink {
    tx: mpsc::Sender<BlogPost>,
}

impl PostSink for ChannelSink {
    fn send(&mut self, post: BlogPost) -> Result<(), SinkClosed> {
        self.tx
            .blocking_send(post)
            .map_err(|_| SinkClosed("list stream receiver dropped".to_string()))
    }
}

fn handler_crashed(err: JoinError) -> Status {
    error!("event=rpc_call module=server status=error error={}", err);
    Status::new(Code::Internal, format!("handler failed: {err}"))
}

async fn write_frame(writer: &mut OwnedWriteHalf, frame: &Frame) -> io::Result<()> {
    let line = encode_line(frame)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
