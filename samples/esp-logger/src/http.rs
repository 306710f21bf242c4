use std::time::Duration;

use embedded_svc::http::Method;
use embedded_svc::http::client::Connection;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::io::{EspIOError, Read, Write};
use uesp_logger_embedded::{HttpClient, HttpResponse};

use crate::error::Result;

const TIMEOUT: Duration = Duration::from_secs(10);

pub struct EspHttpClient {
    connection: EspHttpConnection,
}

impl EspHttpClient {
    pub fn new() -> Result<Self> {
        let connection = EspHttpConnection::new(&Configuration {
            timeout: Some(TIMEOUT),
            ..Default::default()
        })?;

        Ok(Self { connection })
    }
}

/// Response of the last request. The connection is drained when this is
/// dropped so the next request starts clean.
pub struct EspResponse<'a> {
    connection: &'a mut EspHttpConnection,
}

impl HttpResponse for EspResponse<'_> {
    fn status(&self) -> u16 {
        self.connection.status()
    }
}

impl Drop for EspResponse<'_> {
    fn drop(&mut self) {
        let mut buf = [0u8; 64];
        while let Ok(len) = self.connection.read(&mut buf) {
            if len == 0 {
                break;
            }
        }
    }
}

impl HttpClient for EspHttpClient {
    type Error = EspIOError;
    type Response<'a> = EspResponse<'a>;

    fn post<'a>(
        &'a mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> core::result::Result<EspResponse<'a>, EspIOError> {
        let content_length = body.len().to_string();
        let mut request_headers = headers.to_vec();
        request_headers.push(("Content-Length", &content_length));

        self.connection
            .initiate_request(Method::Post, url, &request_headers)?;
        self.connection.write_all(body)?;
        self.connection.initiate_response()?;

        Ok(EspResponse {
            connection: &mut self.connection,
        })
    }
}
