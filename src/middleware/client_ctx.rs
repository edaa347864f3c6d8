use crate::db::get_db_pool;
use crate::error::Error;
use crate::identity::{authenticate_by_session, Principal};
use actix_session::Session;
use actix_web::dev::{
    self, Extensions, Payload, Service, ServiceRequest, ServiceResponse, Transform,
};
use actix_web::{web::Data, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;

/// Client data stored for a single request cycle.
#[derive(Clone, Debug, Default)]
pub struct ClientCtxInner {
    /// Acting principal. None is an unauthenticated caller.
    pub principal: Option<Principal>,
}

impl ClientCtxInner {
    pub async fn from_session(session: &Session) -> Self {
        ClientCtxInner {
            principal: authenticate_by_session(session, get_db_pool()).await,
        }
    }
}

/// Client context passed to routes.
/// Wraps ClientCtxInner, which is set at the beginning of the request.
#[derive(Clone, Debug)]
pub struct ClientCtx(Data<ClientCtxInner>);

impl Default for ClientCtx {
    fn default() -> Self {
        Self(Data::new(ClientCtxInner::default()))
    }
}

impl ClientCtx {
    fn get_or_default_from_extensions(extensions: &mut Extensions) -> Self {
        match extensions.get::<Data<ClientCtxInner>>() {
            Some(cbox) => Self(cbox.clone()),
            None => Self::default(),
        }
    }

    pub fn get_principal(&self) -> Option<Principal> {
        self.0.principal
    }

    /// Returns either the user's id or None.
    pub fn get_id(&self) -> Option<i32> {
        self.0.principal.map(|p| p.id)
    }

    pub fn is_user(&self) -> bool {
        self.0.principal.is_some()
    }

    pub fn is_staff(&self) -> bool {
        self.0.principal.map(|p| p.is_staff()).unwrap_or(false)
    }

    /// Require an authenticated caller. Returns the user id.
    pub fn require_login(&self) -> Result<i32, Error> {
        self.get_id().ok_or(Error::Unauthorized("Login required"))
    }

    /// Require a staff caller. Returns the user id.
    pub fn require_staff(&self) -> Result<i32, Error> {
        let user_id = self.require_login()?;
        if !self.is_staff() {
            return Err(Error::Forbidden("Staff only"));
        }
        Ok(user_id)
    }

    /// Require the caller to own the resource or be staff.
    pub fn require_owner_or_staff(&self, resource_user_id: Option<i32>) -> Result<(), Error> {
        let user_id = self.require_login()?;
        if self.is_staff() {
            return Ok(());
        }
        match resource_user_id {
            Some(owner_id) if owner_id == user_id => Ok(()),
            _ => Err(Error::Forbidden("You don't own this resource")),
        }
    }
}

/// This implementation is what actually provides the `client: ClientCtx` in the parameters of route functions.
impl FromRequest for ClientCtx {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(ClientCtx::get_or_default_from_extensions(
            &mut req.extensions_mut(),
        )))
    }
}

impl<S: 'static, B> Transform<S, ServiceRequest> for ClientCtx
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = ClientCtxMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ClientCtxMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// Client context middleware
pub struct ClientCtxMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ClientCtxMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        // Borrows of `req` must be done in a precise way to avoid conflicts.
        let (httpreq, payload) = req.into_parts();
        let session = Session::extract(&httpreq).into_inner();
        let req = ServiceRequest::from_parts(httpreq, payload);

        Box::pin(async move {
            match session {
                Ok(session) => {
                    let inner = ClientCtxInner::from_session(&session).await;
                    req.extensions_mut().insert(Data::new(inner));
                }
                Err(err) => {
                    log::error!("Unable to extract Session data in middleware: {}", err);
                }
            };

            svc.call(req).await
        })
    }
}
