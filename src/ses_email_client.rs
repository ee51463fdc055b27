use async_trait::async_trait;
use rusoto_core::Region;
use rusoto_ses::{Body, Content, Destination, Message, SendEmailRequest, Ses, SesClient};

use crate::error::ReservationCheckError;
use crate::settings::SesSettings;

pub struct SesEmailClient {
    client: SesClient,
}

#[async_trait]
pub trait SendReport {
    async fn send_report(
        &self,
        settings: &SesSettings,
        body: &str,
    ) -> Result<(), ReservationCheckError>;
}

#[async_trait]
impl SendReport for SesEmailClient {
    async fn send_report(
        &self,
        settings: &SesSettings,
        body: &str,
    ) -> Result<(), ReservationCheckError> {
        let request = SendEmailRequest {
            source: settings.source.clone(),
            destination: Destination {
                to_addresses: Some(settings.destination.to_addresses.clone()),
                ..Destination::default()
            },
            message: Message {
                subject: Content {
                    data: settings.subject.clone(),
                    charset: None,
                },
                body: Body {
                    text: Some(Content {
                        data: body.to_string(),
                        charset: None,
                    }),
                    html: None,
                },
            },
            ..SendEmailRequest::default()
        };

        self.client
            .send_email(request)
            .await
            .map_err(ReservationCheckError::SendReportFailed)?;

        Ok(())
    }
}

impl SesEmailClient {
    pub fn new(region: Region) -> Self {
        SesEmailClient {
            client: SesClient::new(region),
        }
    }

    #[cfg(test)]
    fn new_with_client(client: SesClient) -> Self {
        SesEmailClient { client }
    }
}

#[cfg(test)]
mod tests {
    use crate::ses_email_client::{SendReport, SesEmailClient};
    use crate::settings::SesSettings;
    use rusoto_mock::{
        MockCredentialsProvider, MockRequestDispatcher, MockResponseReader, ReadMockResponse,
    };
    use rusoto_ses::SesClient;

    #[tokio::test]
    async fn test_send_report() {
        let mock = SesClient::new_with(
            MockRequestDispatcher::default().with_body(&*MockResponseReader::read_response(
                "test_resources/valid",
                "send_email.xml",
            )),
            MockCredentialsProvider,
            Default::default(),
        );

        let client = SesEmailClient::new_with_client(mock);
        let result = client
            .send_report(&SesSettings::default(), "report body")
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_send_report_error() {
        let mock = SesClient::new_with(
            MockRequestDispatcher::with_status(400).with_body(&*MockResponseReader::read_response(
                "test_resources/error",
                "send_email.xml",
            )),
            MockCredentialsProvider,
            Default::default(),
        );

        let client = SesEmailClient::new_with_client(mock);
        let result = client
            .send_report(&SesSettings::default(), "report body")
            .await;

        assert!(result.is_err());
    }
}
