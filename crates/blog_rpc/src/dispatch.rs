//! Maps decoded requests onto blog service handlers.

use crate::protocol::{
    Blog, Code, CreateBlogRequest, CreateBlogResponse, DeleteBlogRequest, DeleteBlogResponse,
    ListBlogsRequest, ReadBlogRequest, ReadBlogResponse, Request, Response, Status,
    UpdateBlogRequest, UpdateBlogResponse,
};
use crate::store::Store;
use blog_core::{NewPost, PostSink};
use std::sync::Arc;

/// Routes each RPC to its handler against the shared store.
///
/// All methods block on the store lock and on storage I/O; `list_blogs`
/// also blocks on its sink.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<Store>,
}

impl Dispatcher {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Handles a single-response RPC.
    ///
    /// `ListBlogs` is streaming and is rejected here; use [`Self::list_blogs`].
    pub fn unary(&self, request: Request) -> Result<Response, Status> {
        match request {
            Request::CreateBlog(req) => self.create_blog(req).map(Response::CreateBlog),
            Request::ReadBlog(req) => self.read_blog(req).map(Response::ReadBlog),
            Request::UpdateBlog(req) => self.update_blog(req).map(Response::UpdateBlog),
            Request::DeleteBlog(req) => self.delete_blog(req).map(Response::DeleteBlog),
            Request::ListBlogs(_) => Err(Status::new(
                Code::InvalidArgument,
                "ListBlogs is a streaming method",
            )),
        }
    }

    pub fn create_blog(&self, request: CreateBlogRequest) -> Result<CreateBlogResponse, Status> {
        let blog = request.blog;
        let post = NewPost::new(blog.title, blog.author, blog.content);
        let stored = self
            .store
            .with_service(|service| service.create_blog(post))?;
        Ok(CreateBlogResponse {
            blog: Blog::with_id(stored),
        })
    }

    pub fn read_blog(&self, request: ReadBlogRequest) -> Result<ReadBlogResponse, Status> {
        let post = self
            .store
            .with_service(|service| service.read_blog(&request.title, &request.author))?;
        Ok(ReadBlogResponse {
            blog: Blog::with_id(post),
        })
    }

    pub fn update_blog(&self, request: UpdateBlogRequest) -> Result<UpdateBlogResponse, Status> {
        let post = self.store.with_service(|service| {
            service.update_blog(&request.title, &request.author, &request.content)
        })?;
        Ok(UpdateBlogResponse {
            blog: Blog::without_id(post),
        })
    }

    pub fn delete_blog(&self, request: DeleteBlogRequest) -> Result<DeleteBlogResponse, Status> {
        let confirmation = self
            .store
            .with_service(|service| service.delete_blog(&request.title, &request.author))?;
        Ok(DeleteBlogResponse { confirmation })
    }

    /// Streams every post into `sink`; returns the delivered count.
    ///
    /// The store lock is taken per batch, never across a `sink.send`.
    pub fn list_blogs(
        &self,
        _request: ListBlogsRequest,
        sink: &mut dyn PostSink,
    ) -> Result<usize, Status> {
        Ok(self.store.list_blogs(sink)?)
    }
}
