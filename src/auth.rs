use std::{collections::HashSet, marker::PhantomData};

use headers::authorization::{Bearer, Credentials};
use http::{Request, Response, StatusCode, header};
use tower_http::validate_request::ValidateRequest;

/// Accepts any of the configured static bearer tokens.
/// An empty token list disables the check.
#[derive(Debug)]
pub struct ManyValidate<ResBody> {
    tokens: HashSet<String>,
    _ty: PhantomData<fn() -> ResBody>,
}

impl<ResBody> ManyValidate<ResBody> {
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter().filter(|t| !t.is_empty()).collect(),
            _ty: PhantomData,
        }
    }
}

impl<ResBody> Clone for ManyValidate<ResBody> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            _ty: PhantomData,
        }
    }
}

impl<B, ResBody> ValidateRequest<B> for ManyValidate<ResBody>
where
    ResBody: Default,
{
    type ResponseBody = ResBody;

    fn validate(&mut self, request: &mut Request<B>) -> Result<(), Response<Self::ResponseBody>> {
        if self.tokens.is_empty() {
            return Ok(());
        }
        match request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(Bearer::decode)
        {
            Some(bearer) if self.tokens.contains(bearer.token()) => Ok(()),
            _ => {
                let mut res = Response::new(ResBody::default());
                *res.status_mut() = StatusCode::UNAUTHORIZED;
                Err(res)
            }
        }
    }
}
