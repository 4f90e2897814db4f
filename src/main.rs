use api::{
    bot::{Bot, Discord},
    interaction::{self, VerifyingKey},
    lobby::{Config, Lobby},
    Library,
};
use core::{convert::Infallible, pin::pin, time::Duration};
use hyper::{body::Incoming, server::conn::http1, service::service_fn, Request};
use hyper_util::rt::TokioIo;
use std::{env, net::Ipv4Addr, sync::Arc};
use tokio::{net::TcpListener, runtime::Runtime};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse environment variables
    let port: u16 = env::var("PORT")?.parse()?;
    let token = env::var("TOKEN")?;
    let public = hex::decode(env::var("PUB_KEY")?)?;
    let public = VerifyingKey::from_bytes(public.as_slice().try_into()?)?;
    let dir = env::var("QUIZ_DIR").unwrap_or_else(|_| String::from("daily_quizzes"));

    let mut config = Config::default();
    if let Ok(quorum) = env::var("QUORUM") {
        config.quorum = quorum.parse()?;
    }
    if let Ok(secs) = env::var("TIME_LIMIT") {
        config.time_limit = Duration::from_secs(secs.parse()?);
    }
    anyhow::ensure!(config.quorum > 0, "QUORUM must be positive");

    let runtime = Runtime::new()?;
    runtime.block_on(run(port, token, public, dir, config))
}

async fn run(port: u16, token: String, public: VerifyingKey, dir: String, config: Config) -> anyhow::Result<()> {
    let library = Library::new(dir);
    library.init().await?;
    log::info!("serving quizzes from {}", library.root().display());

    let bot = Bot::new(Lobby::new(Discord::new(token), library, config));
    let state = Arc::new((bot, public));

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
    log::info!("listening on port {port}");

    let mut shutdown = pin!(tokio::signal::ctrl_c());
    loop {
        let (stream, addr) = tokio::select! {
            biased;
            result = &mut shutdown => {
                result?;
                break;
            }
            pair = listener.accept() => pair?,
        };

        let state = state.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let state = state.clone();
                async move {
                    let (bot, public) = &*state;
                    Ok::<_, Infallible>(interaction::respond(req, public, bot).await)
                }
            });

            if let Err(err) = http1::Builder::new().serve_connection(TokioIo::new(stream), service).await {
                log::error!("connection from {addr} failed: {err}");
            }
        });
    }

    log::info!("shutting down");
    Ok(())
}
