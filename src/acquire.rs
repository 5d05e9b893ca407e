//! Acquisition methods: how a token is requested and how it is read from the response.

pub mod direct;
pub mod redirect;

pub use direct::*;
pub use redirect::*;

// crates.io
use oauth2::HttpResponse;
// self
use crate::{_prelude::*, auth::TokenSecret, request::AcquisitionRequest};

/// Acquisition method configured on a broker.
#[derive(Clone, Debug)]
pub enum AcquisitionMethod {
	/// JSON authentication API answering with `AuthenticationResult.IdToken`.
	Direct(DirectAuth),
	/// Hosted login endpoint answering with a redirect whose `Location` carries the token.
	Redirect(HostedLogin),
}
impl AcquisitionMethod {
	/// Returns the method discriminant.
	pub fn kind(&self) -> AcquisitionKind {
		match self {
			Self::Direct(_) => AcquisitionKind::Direct,
			Self::Redirect(_) => AcquisitionKind::Redirect,
		}
	}

	/// Request the method sends when neither the caller nor the store supplies one.
	pub fn configured_request(&self) -> Option<AcquisitionRequest> {
		match self {
			Self::Direct(auth) => Some(auth.to_request()),
			Self::Redirect(login) => login.request.clone(),
		}
	}

	/// Reads the token out of an acquisition response.
	pub fn extract(&self, response: &HttpResponse) -> Result<TokenSecret> {
		match self {
			Self::Direct(_) => direct::extract_id_token(response),
			Self::Redirect(login) => login.extract(response),
		}
	}
}
impl From<DirectAuth> for AcquisitionMethod {
	fn from(auth: DirectAuth) -> Self {
		Self::Direct(auth)
	}
}
impl From<HostedLogin> for AcquisitionMethod {
	fn from(login: HostedLogin) -> Self {
		Self::Redirect(login)
	}
}

/// Acquisition method discriminant used in logs and spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionKind {
	/// See [`AcquisitionMethod::Direct`].
	Direct,
	/// See [`AcquisitionMethod::Redirect`].
	Redirect,
}
impl AcquisitionKind {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Direct => "direct",
			Self::Redirect => "redirect",
		}
	}
}
impl Display for AcquisitionKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
