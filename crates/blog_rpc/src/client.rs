//! Async client for the blog RPC server.
//!
//! One request is outstanding per connection at a time; `&mut self` on every
//! call enforces that. A list stream dropped before its end is drained at the
//! start of the next call.

use crate::protocol::{
    decode_line, encode_line, Blog, CreateBlogRequest, DeleteBlogRequest, Frame, ListBlogsRequest,
    ReadBlogRequest, Request, Response, Status, UpdateBlogRequest,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Client-side failure.
#[derive(Debug)]
pub enum ClientError {
    Io(io::Error),
    Codec(serde_json::Error),
    /// The server answered with an error status.
    Status(Status),
    /// The server answered with a frame that does not fit the call.
    UnexpectedFrame(&'static str),
    ConnectionClosed,
}

impl ClientError {
    /// Returns the server status when the call failed server-side.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Self::Status(status) => Some(status),
            _ => None,
        }
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "connection error: {err}"),
            Self::Codec(err) => write!(f, "malformed frame: {err}"),
            Self::Status(status) => write!(f, "{status}"),
            Self::UnexpectedFrame(expected) => write!(f, "unexpected frame, expected {expected}"),
            Self::ConnectionClosed => write!(f, "connection closed by server"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Status(status) => Some(status),
            Self::UnexpectedFrame(_) | Self::ConnectionClosed => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

pub struct BlogClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    /// A list stream was started and its terminal frame not yet read.
    stream_open: bool,
}

impl BlogClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> ClientResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
            stream_open: false,
        })
    }

    pub async fn create_blog(
        &mut self,
        title: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> ClientResult<Blog> {
        let request = Request::CreateBlog(CreateBlogRequest {
            blog: Blog::new(title, author, content),
        });
        match self.call(&request).await? {
            Response::CreateBlog(response) => Ok(response.blog),
            _ => Err(ClientError::UnexpectedFrame("CreateBlog response")),
        }
    }

    pub async fn read_blog(
        &mut self,
        title: impl Into<String>,
        author: impl Into<String>,
    ) -> ClientResult<Blog> {
        let request = Request::ReadBlog(ReadBlogRequest {
            title: title.into(),
            author: author.into(),
        });
        match self.call(&request).await? {
            Response::ReadBlog(response) => Ok(response.blog),
            _ => Err(ClientError::UnexpectedFrame("ReadBlog response")),
        }
    }

    pub async fn update_blog(
        &mut self,
        title: impl Into<String>,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> ClientResult<Blog> {
        let request = Request::UpdateBlog(UpdateBlogRequest {
            title: title.into(),
            author: author.into(),
            content: content.into(),
        });
        match self.call(&request).await? {
            Response::UpdateBlog(response) => Ok(response.blog),
            _ => Err(ClientError::UnexpectedFrame("UpdateBlog response")),
        }
    }

    /// Returns the server's confirmation text.
    pub async fn delete_blog(
        &mut self,
        title: impl Into<String>,
        author: impl Into<String>,
    ) -> ClientResult<String> {
        let request = Request::DeleteBlog(DeleteBlogRequest {
            title: title.into(),
            author: author.into(),
        });
        match self.call(&request).await? {
            Response::DeleteBlog(response) => Ok(response.confirmation),
            _ => Err(ClientError::UnexpectedFrame("DeleteBlog response")),
        }
    }

    /// Starts a list stream. The stream borrows the connection; dropping it
    /// early leaves the rest to be skipped by the next call.
    pub async fn list_blogs(&mut self) -> ClientResult<BlogStream<'_>> {
        self.drain_stream().await?;
        self.send(&Request::ListBlogs(ListBlogsRequest {})).await?;
        self.stream_open = true;
        Ok(BlogStream { client: self })
    }

    async fn call(&mut self, request: &Request) -> ClientResult<Response> {
        self.drain_stream().await?;
        self.send(request).await?;
        match self.recv().await? {
            Frame::Unary(response) => Ok(response),
            Frame::Error(status) => Err(ClientError::Status(status)),
            _ => Err(ClientError::UnexpectedFrame("unary reply")),
        }
    }

    async fn send(&mut self, request: &Request) -> ClientResult<()> {
        let line = encode_line(request)?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads and discards frames up to the end of an abandoned list stream.
    async fn drain_stream(&mut self) -> ClientResult<()> {
        while self.stream_open {
            match self.next_stream_item().await {
                // The abandoned stream's own failure is not this call's.
                Ok(_) | Err(ClientError::Status(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Next item of the open list stream; closes it on any terminal frame.
    async fn next_stream_item(&mut self) -> ClientResult<Option<Blog>> {
        let frame = self.recv().await;
        if !matches!(frame, Ok(Frame::StreamItem(_))) {
            self.stream_open = false;
        }
        match frame? {
            Frame::StreamItem(item) => Ok(Some(item.blog)),
            Frame::StreamEnd => Ok(None),
            Frame::Error(status) => Err(ClientError::Status(status)),
            Frame::Unary(_) => Err(ClientError::UnexpectedFrame("stream item")),
        }
    }

    async fn recv(&mut self) -> ClientResult<Frame> {
        loop {
            let line = self
                .lines
                .next_line()
                .await?
                .ok_or(ClientError::ConnectionClosed)?;
            if !line.trim().is_empty() {
                return Ok(decode_line(&line)?);
            }
        }
    }
}

/// Incoming `ListBlogs` results.
pub struct BlogStream<'a> {
    client: &'a mut BlogClient,
}

impl BlogStream<'_> {
    /// Next post, or `None` once the server signalled the end of the stream.
    pub async fn message(&mut self) -> ClientResult<Option<Blog>> {
        if !self.client.stream_open {
            return Ok(None);
        }
        self.client.next_stream_item().await
    }

    /// Drains the remaining stream into a vector.
    pub async fn collect(mut self) -> ClientResult<Vec<Blog>> {
        let mut blogs = Vec::new();
        while let Some(blog) = self.message().await? {
            blogs.push(blog);
        }
        Ok(blogs)
    }
}
