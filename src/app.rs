use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use eframe::egui;
use egui::{Color32, RichText};
use num_format::{Locale, ToFormattedString};
use tracing::error;

use crate::config::AppConfig;
use crate::fetcher::BrowserFetcher;
use crate::inference::{InferenceClient, ModelChoice};
use crate::pipeline::{self, StageEvent};

/// Messages sent from the request worker back to the UI thread.
enum PipelineUpdate {
    Stage(&'static str),
    Scraped {
        title: Option<String>,
        excerpt: String,
    },
    Finished {
        email: String,
    },
    Failed {
        message: String,
    },
}

pub struct WarmerApp {
    config: AppConfig,
    client: Arc<InferenceClient>,

    url_input: String,
    model: ModelChoice,

    running: bool,
    stage: Option<&'static str>,
    page_title: Option<String>,
    excerpt: String,
    email: String,
    error: Option<String>,
    notification: Option<(String, Instant)>,

    update_rx: mpsc::Receiver<PipelineUpdate>,
    update_tx: mpsc::Sender<PipelineUpdate>,
}

impl WarmerApp {
    pub fn new(config: AppConfig) -> Self {
        let (update_tx, update_rx) = mpsc::channel();
        let client = Arc::new(InferenceClient::new(&config));
        let model = config.default_model;
        Self {
            config,
            client,
            url_input: String::new(),
            model,
            running: false,
            stage: None,
            page_title: None,
            excerpt: String::new(),
            email: String::new(),
            error: None,
            notification: None,
            update_rx,
            update_tx,
        }
    }

    /// One request per button press; each run gets a fresh browser session
    /// and leaves nothing behind.
    fn start_analysis(&mut self) {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            self.error = Some("Enter a website URL first.".to_string());
            return;
        }

        self.running = true;
        self.stage = Some("Starting…");
        self.page_title = None;
        self.excerpt.clear();
        self.email.clear();
        self.error = None;

        let tx = self.update_tx.clone();
        let config = self.config.clone();
        let client = Arc::clone(&self.client);
        let model = self.model;

        thread::spawn(move || {
            let fetcher = BrowserFetcher::new(&config);
            let progress_tx = tx.clone();
            let outcome = pipeline::run(&fetcher, client.as_ref(), &config, &url, model, |event| {
                let update = match event {
                    StageEvent::Fetching => PipelineUpdate::Stage("Fetching website content…"),
                    StageEvent::Scraped { title, excerpt } => {
                        PipelineUpdate::Scraped { title, excerpt }
                    }
                    StageEvent::Generating => PipelineUpdate::Stage("Generating outreach email…"),
                };
                let _ = progress_tx.send(update);
            });
            let update = match outcome {
                Ok(analysis) => PipelineUpdate::Finished {
                    email: analysis.email,
                },
                Err(err) => {
                    error!(url = %url, error = %err, "analysis failed");
                    PipelineUpdate::Failed {
                        message: err.to_string(),
                    }
                }
            };
            let _ = tx.send(update);
        });
    }

    fn drain_updates(&mut self) {
        while let Ok(update) = self.update_rx.try_recv() {
            match update {
                PipelineUpdate::Stage(stage) => self.stage = Some(stage),
                PipelineUpdate::Scraped { title, excerpt } => {
                    self.page_title = title;
                    self.excerpt = excerpt;
                }
                PipelineUpdate::Finished { email } => {
                    self.email = email;
                    self.running = false;
                    self.stage = None;
                }
                PipelineUpdate::Failed { message } => {
                    self.error = Some(message);
                    self.running = false;
                    self.stage = None;
                }
            }
        }
    }

    fn input_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("input_panel").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.heading("AI Business Warmer");
            ui.label(
                "Enter a business website URL. The assistant scrapes it and drafts a cold \
outreach email around automation opportunities.",
            );
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.label("Website URL:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.url_input)
                        .desired_width(420.0)
                        .hint_text("https://example-business.com"),
                );
                egui::ComboBox::from_label("Model")
                    .selected_text(self.model.label())
                    .show_ui(ui, |ui| {
                        for model in ModelChoice::ALL {
                            ui.selectable_value(&mut self.model, model, model.label());
                        }
                    });
                if ui
                    .add_enabled(!self.running, egui::Button::new("Analyze Website"))
                    .clicked()
                {
                    self.start_analysis();
                }
                if self.running {
                    ui.spinner();
                    if let Some(stage) = self.stage {
                        ui.label(stage);
                    }
                }
            });
            if let Some(error) = &self.error {
                ui.colored_label(ui.visuals().error_fg_color, error);
            }
            ui.add_space(6.0);
        });
    }

    fn output_panels(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |columns| {
                let left = &mut columns[0];
                left.heading("Scraped Summary");
                if let Some(title) = &self.page_title {
                    left.label(RichText::new(title).strong());
                }
                if !self.excerpt.is_empty() {
                    let chars = self.excerpt.chars().count();
                    let approx_tokens = (chars as f32 / 4.0).ceil() as usize;
                    left.label(format!(
                        "{} characters (bound {}), ~{} prompt tokens",
                        chars.to_formatted_string(&Locale::en),
                        self.config.max_scrape_chars.to_formatted_string(&Locale::en),
                        approx_tokens.to_formatted_string(&Locale::en),
                    ));
                }
                left.separator();
                egui::ScrollArea::vertical()
                    .id_salt("excerpt_scroll_area")
                    .show(left, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(&mut self.excerpt.as_str())
                                .desired_width(f32::INFINITY)
                                .desired_rows(24),
                        );
                    });

                let right = &mut columns[1];
                right.heading("Generated Email");
                right.separator();
                egui::ScrollArea::vertical()
                    .id_salt("email_scroll_area")
                    .show(right, |ui| {
                        ui.add(
                            egui::TextEdit::multiline(&mut self.email.as_str())
                                .desired_width(f32::INFINITY)
                                .desired_rows(24),
                        );
                    });
                if !self.email.is_empty() {
                    if right.button("Copy Email").clicked() {
                        ctx.copy_text(self.email.clone());
                        self.notification =
                            Some(("Email copied to clipboard!".to_owned(), Instant::now()));
                    }
                    const NOTIFICATION_DURATION: f32 = 3.0;
                    if let Some((message, start)) = &self.notification {
                        let elapsed = start.elapsed().as_secs_f32();
                        if elapsed < NOTIFICATION_DURATION {
                            let alpha = 1.0 - elapsed / NOTIFICATION_DURATION;
                            let text = RichText::new(message).color(
                                Color32::from_rgba_unmultiplied(
                                    255,
                                    255,
                                    255,
                                    (alpha * 255.0) as u8,
                                ),
                            );
                            right.label(text);
                            ctx.request_repaint();
                        } else {
                            self.notification = None;
                        }
                    }
                }
            });
        });
    }
}

impl eframe::App for WarmerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_updates();
        self.input_panel(ctx);
        self.output_panels(ctx);
        if self.running {
            // Keep painting while the worker is busy so updates drain promptly.
            ctx.request_repaint();
        }
    }
}

pub fn run(config: AppConfig) -> eframe::Result<()> {
    let app = WarmerApp::new(config);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1100.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "AI Business Warmer",
        options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
